use cpre::error::{Diagnostics, Severity};
use cpre::spelling::Spelling;
use cpre::tokenizer::{concatenate, PpToken, PpTokenKind, Tokenizer};

fn tokenize(input: &str) -> (Vec<PpToken>, Diagnostics) {
    let mut diags = Diagnostics::new(false);
    let mut tokens = Vec::new();
    let mut tokenizer = Tokenizer::from_source("test.c", input.as_bytes().to_vec());

    while tokenizer.tokenize_line(&mut tokens, &mut diags) {}

    (tokens, diags)
}

fn kinds(input: &str) -> Vec<PpTokenKind> {
    let (tokens, diags) = tokenize(input);
    assert!(!diags.has_errors(), "unexpected diagnostics for {:?}", input);
    tokens.iter().map(|t| t.kind).collect()
}

fn spellings(input: &str) -> Vec<String> {
    let (tokens, _) = tokenize(input);
    tokens.iter().map(|t| t.data.to_string()).collect()
}

#[test]
fn test_identifiers_and_numbers() {
    assert_eq!(vec![
        PpTokenKind::Identifier,
        PpTokenKind::Identifier,
        PpTokenKind::Number,
        PpTokenKind::Number,
    ], kinds("foo _bar42 123 .5\n"));

    // pp-numbers are permissive: suffix garbage and exponents stay in one token.
    assert_eq!(vec!["42abc", "1e+5", "0x1p-3", "1.2.3", "0xdeadBEEFul"],
        spellings("42abc 1e+5 0x1p-3 1.2.3 0xdeadBEEFul\n"));

    // A dot not followed by a digit is a punctuator.
    assert_eq!(vec![
        PpTokenKind::Identifier,
        PpTokenKind::Dot,
        PpTokenKind::Identifier,
    ], kinds("a.b\n"));
}

#[test]
fn test_punctuators_maximal_munch() {
    assert_eq!(vec![
        PpTokenKind::Increment,
        PpTokenKind::Plus,
    ], kinds("+++\n"));

    assert_eq!(vec![
        PpTokenKind::RightShiftAssign,
        PpTokenKind::LeftShiftAssign,
        PpTokenKind::Arrow,
        PpTokenKind::Decrement,
        PpTokenKind::LogicalAnd,
        PpTokenKind::BitwiseAndAssign,
    ], kinds(">>= <<= -> -- && &=\n"));

    assert_eq!(vec![
        PpTokenKind::Hash,
        PpTokenKind::DoubleHash,
        PpTokenKind::Dot,
        PpTokenKind::Dot,
        PpTokenKind::Dot,
    ], kinds("# ## ...\n"));
}

#[test]
fn test_digraphs() {
    assert_eq!(vec![
        PpTokenKind::OpenSquareBracket,
        PpTokenKind::CloseSquareBracket,
        PpTokenKind::OpenBracket,
        PpTokenKind::CloseBracket,
        PpTokenKind::Hash,
        PpTokenKind::DoubleHash,
    ], kinds("<: :> <% %> %: %:%:\n"));

    // Digraphs keep their spelling, only the kind is normalized.
    assert_eq!(vec!["<:", ":>"], spellings("<: :>\n"));
}

#[test]
fn test_trigraphs() {
    assert_eq!(vec![
        PpTokenKind::OpenSquareBracket,
        PpTokenKind::CloseSquareBracket,
        PpTokenKind::OpenBracket,
        PpTokenKind::CloseBracket,
        PpTokenKind::BitwiseOr,
        PpTokenKind::BitwiseNot,
        PpTokenKind::BitwiseXor,
    ], kinds("??( ??) ??< ??> ??! ??- ??'\n"));

    // ??= is #, so this line is a directive-shaped token sequence.
    assert_eq!(vec![
        PpTokenKind::Hash,
        PpTokenKind::Identifier,
    ], kinds("??=define\n"));

    // A ?? that is not a trigraph stays as-is.
    assert_eq!(vec![
        PpTokenKind::QuestionMark,
        PpTokenKind::QuestionMark,
        PpTokenKind::Identifier,
    ], kinds("??x\n"));
}

#[test]
fn test_line_splices() {
    let (tokens, _) = tokenize("fo\\\no\n");
    assert_eq!(1, tokens.len());
    assert_eq!("foo", tokens[0].data.as_str());

    // With an intervening carriage return.
    let (tokens, _) = tokenize("fo\\\r\no\n");
    assert_eq!(1, tokens.len());
    assert_eq!("foo", tokens[0].data.as_str());

    // The ??/ trigraph is a backslash and still splices.
    let (tokens, _) = tokenize("a??/\nb\n");
    assert_eq!(1, tokens.len());
    assert_eq!("ab", tokens[0].data.as_str());
}

#[test]
fn test_splice_at_end_of_input() {
    let (tokens, diags) = tokenize("a\\");
    assert_eq!(1, tokens.len());
    assert_eq!("a", tokens[0].data.as_str());
    assert!(diags.records().iter().any(|d| d.severity == Severity::Warning));
}

#[test]
fn test_source_positions() {
    let (tokens, _) = tokenize("a bb\n  c\n");

    assert_eq!((1, 1), (tokens[0].source.line, tokens[0].source.column));
    assert_eq!((1, 3), (tokens[1].source.line, tokens[1].source.column));
    assert_eq!((2, 3), (tokens[2].source.line, tokens[2].source.column));
}

#[test]
fn test_comments_are_whitespace() {
    let (tokens, _) = tokenize("a/* x */b\n");
    assert_eq!(2, tokens.len());
    assert!(tokens[0].has_whitespace);

    let (tokens, _) = tokenize("a // trailing\nb\n");
    assert_eq!(2, tokens.len());

    // Multi-line comments span logical lines.
    let (tokens, _) = tokenize("a/* one\ntwo */ b\n");
    assert_eq!(2, tokens.len());
    assert_eq!("b", tokens[1].data.as_str());
}

#[test]
fn test_unterminated_comment() {
    let (tokens, diags) = tokenize("a /* never closed\n");
    assert_eq!(1, tokens.len());
    assert!(diags.has_errors());
}

#[test]
fn test_whitespace_flags() {
    let (tokens, _) = tokenize("a b+c\n");

    assert!(tokens[0].has_whitespace);
    assert!(!tokens[1].has_whitespace);
    assert!(!tokens[2].has_whitespace);
    // The newline counts as whitespace after the last token.
    assert!(tokens[3].has_whitespace);
}

#[test]
fn test_string_and_char_literals() {
    assert_eq!(vec!["\"hello world\"", "'x'"], spellings("\"hello world\" 'x'\n"));

    // Escaped quotes and backslashes do not terminate the literal.
    assert_eq!(vec!["\"a\\\"b\"", "\"a\\\\\""], spellings("\"a\\\"b\" \"a\\\\\"\n"));
    assert_eq!(vec!["'\\''"], spellings("'\\''\n"));

    let (tokens, diags) = tokenize("\"unterminated\n");
    assert!(tokens.is_empty());
    assert!(diags.has_errors());
}

#[test]
fn test_header_name_latch() {
    let (tokens, _) = tokenize("#include <stdio.h>\n");
    assert_eq!(vec![
        PpTokenKind::Hash,
        PpTokenKind::Identifier,
        PpTokenKind::HeaderName,
    ], tokens.iter().map(|t| t.kind).collect::<Vec<_>>());
    assert_eq!("<stdio.h>", tokens[2].data.as_str());

    let (tokens, _) = tokenize("#include \"x/y.h\"\n");
    assert_eq!(PpTokenKind::HeaderName, tokens[2].kind);
    assert_eq!("\"x/y.h\"", tokens[2].data.as_str());

    // The latch only arms when # opens the line.
    let (tokens, _) = tokenize("x #include <y>\n");
    assert!(tokens.iter().all(|t| t.kind != PpTokenKind::HeaderName));

    // The latch covers exactly one token past the include keyword.
    let (tokens, _) = tokenize("#include <a.h> <b\n");
    assert_eq!(PpTokenKind::HeaderName, tokens[2].kind);
    assert_eq!(PpTokenKind::Less, tokens[3].kind);
}

#[test]
fn test_unknown_bytes() {
    let (tokens, _) = tokenize("a @ b\n");
    assert_eq!(PpTokenKind::Other, tokens[1].kind);
    assert_eq!("@", tokens[1].data.as_str());
}

#[test]
fn test_concatenate() {
    let (lhs, _) = tokenize("foo\n");
    let (rhs, _) = tokenize("42\n");
    let pasted = concatenate(&lhs[0], &rhs[0]).unwrap();
    assert_eq!(PpTokenKind::Identifier, pasted.kind);
    assert_eq!("foo42", pasted.data.as_str());

    let (lhs, _) = tokenize("+\n");
    let (rhs, _) = tokenize("=\n");
    let pasted = concatenate(&lhs[0], &rhs[0]).unwrap();
    assert_eq!(PpTokenKind::PlusAssign, pasted.kind);

    // Two hashes paste into the inert ## kind.
    let (lhs, _) = tokenize("#\n");
    let (rhs, _) = tokenize("#\n");
    let pasted = concatenate(&lhs[0], &rhs[0]).unwrap();
    assert_eq!(PpTokenKind::ConcatDoubleHash, pasted.kind);

    // Pasting that does not form a single pp-token fails.
    let (lhs, _) = tokenize("+\n");
    let (rhs, _) = tokenize("/\n");
    assert!(concatenate(&lhs[0], &rhs[0]).is_none());
}

#[test]
fn test_spelling_promotion() {
    let mut spelling = Spelling::from_slice(b"0123456789012345678901");
    assert!(!spelling.is_heap());

    spelling.push(b'x');
    assert!(!spelling.is_heap());
    assert_eq!(23, spelling.len());

    // The 24th byte promotes to the heap, and it stays there.
    spelling.push(b'y');
    assert!(spelling.is_heap());
    assert_eq!(24, spelling.len());

    assert!(Spelling::from_slice(&[b'a'; 24]).is_heap());
    assert!(!Spelling::from_slice(&[b'a'; 23]).is_heap());
}
