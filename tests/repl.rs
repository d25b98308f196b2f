use luna::repl::bracket_depth;

#[test]
fn balanced_input_is_complete() {
    assert_eq!(bracket_depth("io.print([1, 2], {a: 3})"), 0);
}

#[test]
fn open_block_needs_more_lines() {
    assert_eq!(bracket_depth("fn f a {\n  if a {"), 2);
    assert_eq!(bracket_depth("fn f a {\n  return a\n}"), 0);
}

#[test]
fn brackets_inside_strings_are_ignored() {
    assert_eq!(bracket_depth("x: var = \"{[(\""), 0);
    assert_eq!(bracket_depth("y: var = 'it\\'s {'"), 0);
}

#[test]
fn brackets_inside_comments_are_ignored() {
    assert_eq!(bracket_depth("x: var = 1 # {\n"), 0);
}
