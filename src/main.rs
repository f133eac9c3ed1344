use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::fs;

use docopt::Docopt;
use serde::Deserialize;

use cpre::io::Output;
use cpre::preprocess;

const USAGE: &'static str = "
cpre

Preprocess a C11 translation unit and emit the resulting token stream.

Usage:
    cpre [-v] [--werror] [-I <dir>]... [-D <macro>]... [-U <name>]... <source> [<target>]
    cpre (-h | --help)
    cpre --version

Options:
    -I --include <dir>       Folder to search for includes (repeatable).
    -D --define <macro>      Predefine a macro as NAME or NAME=VALUE (repeatable).
    -U --undefine <name>     Undefine a macro before preprocessing (repeatable).
    -v --verbose             Enable verbose output.
    --werror                 Treat warnings as errors.
    -h --help                Show usage information and exit.
    --version                Print the version number and exit.
";

#[derive(Debug, Deserialize)]
struct Args {
    flag_version: bool,
    flag_verbose: bool,
    flag_werror: bool,
    flag_include: bool,
    flag_define: bool,
    flag_undefine: bool,
    arg_dir: Vec<String>,
    arg_macro: Vec<String>,
    arg_name: Vec<String>,
    arg_source: String,
    arg_target: String,
}

fn main() {
    let args: Args = Docopt::new(USAGE)
                            .and_then(|d| d.deserialize())
                            .unwrap_or_else(|e| {
                                if e.fatal() {
                                    eprintln!("{}", e);
                                    std::process::exit(2)
                                } else {
                                    e.exit()
                                }
                            });

    if args.flag_version {
        println!("v{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let mut output = if args.arg_target.is_empty() || args.arg_target == "-" {
        Output::Standard(io::stdout())
    } else {
        match fs::File::create(&args.arg_target) {
            Ok(f) => Output::File(f),
            Err(e) => {
                eprintln!("Could not open output file: {}", e);
                std::process::exit(2);
            }
        }
    };

    let include_dirs: Vec<PathBuf> = args.arg_dir.iter().map(PathBuf::from).collect();

    let code = if args.arg_source == "-" {
        let mut text = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut text) {
            eprintln!("Could not read standard input: {}", e);
            std::process::exit(2);
        }
        cmd_preprocess_stdin(&text, &mut output, include_dirs, &args)
    } else {
        preprocess::cmd_preprocess(
            Path::new(&args.arg_source),
            &mut output,
            include_dirs,
            &args.arg_macro,
            &args.arg_name,
            args.flag_werror,
            args.flag_verbose,
        )
    };

    std::process::exit(code);
}

fn cmd_preprocess_stdin(text: &str, output: &mut Output, include_dirs: Vec<PathBuf>, args: &Args) -> i32 {
    use cpre::error::{print_error, ErrorExt};

    let mut pp = preprocess::Preprocessor::new(include_dirs);
    pp.warnings_as_errors(args.flag_werror);

    for spec in &args.arg_macro {
        if let Err(e) = pp.define_cmdline(spec) {
            print_error(&e);
            return 2;
        }
    }
    for name in &args.arg_name {
        pp.undefine(name);
    }

    match pp.preprocess_str(text, "<stdin>") {
        Ok(tokens) => {
            pp.diagnostics().print_all(args.flag_verbose);
            if let Err(e) = preprocess::write_tokens(&tokens, output).prepend_error("Failed to write output:") {
                print_error(&e);
                return 2;
            }
            if pp.diagnostics().has_errors() { 1 } else { 0 }
        },
        Err(e) => {
            pp.diagnostics().print_all(args.flag_verbose);
            print_error(&e);
            2
        }
    }
}
