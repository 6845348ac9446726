//! Line-to-[`Command`] parsing.
//!
//! One input line becomes at most one [`Command`]. Tokenization is plain
//! whitespace splitting; the only syntax recognized here is a trailing `&`
//! background marker. Redirection tokens (`<`, `>`) are deliberately left in
//! the argument sequence — they belong to the redirection planner, which
//! resolves them inside the forked child.

use crate::command::Command;

/// Replace every `"$$"` in the raw line with the shell's own pid.
///
/// Applied to the raw input before tokenization, scanning left to right
/// without overlap, so `"$$$"` becomes `"<pid>$"`.
pub fn expand_self_pid(line: &str, pid: i32) -> String {
    line.replace("$$", &pid.to_string())
}

/// Parse one already-expanded input line.
///
/// Returns `None` for lines the shell treats as no-ops: blank lines and
/// comment lines (first token starting with `#`). A trailing `&` sets the
/// background flag only when at least one other token precedes it; a lone
/// `&` is passed through as a (doomed) program name, matching the behavior
/// of treating it as an ordinary word.
pub fn parse_line(line: &str) -> Option<Command> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.first() {
        None => return None,
        Some(first) if first.starts_with('#') => return None,
        Some(_) => {}
    }

    let mut background = false;
    if tokens.len() > 1 && tokens.last() == Some(&"&") {
        tokens.pop();
        background = true;
    }

    let program = tokens[0].to_string();
    let args = tokens[1..].iter().map(|t| t.to_string()).collect();
    Some(Command::new(program, args, background))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_noops() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   \t "), None);
        assert_eq!(parse_line("# a comment"), None);
        assert_eq!(parse_line("#comment with no space"), None);
    }

    #[test]
    fn splits_program_and_args() {
        let cmd = parse_line("ls -la /tmp").unwrap();
        assert_eq!(cmd.program, "ls");
        assert_eq!(cmd.args, vec!["-la", "/tmp"]);
        assert!(!cmd.background);
    }

    #[test]
    fn trailing_ampersand_marks_background() {
        let cmd = parse_line("sleep 10 &").unwrap();
        assert_eq!(cmd.program, "sleep");
        assert_eq!(cmd.args, vec!["10"]);
        assert!(cmd.background);
    }

    #[test]
    fn ampersand_elsewhere_is_an_ordinary_word() {
        let cmd = parse_line("echo & done").unwrap();
        assert_eq!(cmd.args, vec!["&", "done"]);
        assert!(!cmd.background);
    }

    #[test]
    fn lone_ampersand_is_not_background() {
        let cmd = parse_line("&").unwrap();
        assert_eq!(cmd.program, "&");
        assert!(!cmd.background);
    }

    #[test]
    fn redirection_tokens_stay_in_args() {
        let cmd = parse_line("wc -l < in.txt > out.txt").unwrap();
        assert_eq!(cmd.args, vec!["-l", "<", "in.txt", ">", "out.txt"]);
    }

    #[test]
    fn self_pid_expansion_is_left_to_right() {
        assert_eq!(expand_self_pid("echo $$", 123), "echo 123");
        assert_eq!(expand_self_pid("a$$b$$c", 7), "a7b7c");
        assert_eq!(expand_self_pid("$$$", 42), "42$");
        assert_eq!(expand_self_pid("no dollars", 42), "no dollars");
    }
}
