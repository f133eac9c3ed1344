use std::io;
use std::io::{Stdout, Write};
use std::fs::File;

pub enum Output {
    File(File),
    Standard(Stdout),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            Output::File(ref mut f)     => f.write(buf),
            Output::Standard(ref mut s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            Output::File(ref mut f)     => f.flush(),
            Output::Standard(ref mut s) => s.flush(),
        }
    }
}
