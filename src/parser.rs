use std::iter::Peekable;

use log::trace;

use crate::command::{Command, OutputMode, OutputRedirect, Pipeline};
use crate::error::ParseError;

const SPLITTERS: [char; 2] = [' ', '\t'];
const PIPE: &str = "|";
const BACKGROUND: char = '&';
const BACKGROUND_TOKEN: &str = "&";
const AUTO_COMPLETE: char = '?';

/// Whether the line ends with the auto-complete marker. Holds even when the
/// rest of the line would not parse.
pub fn is_auto_complete(line: &str) -> bool {
    line.trim_end_matches(SPLITTERS).ends_with(AUTO_COMPLETE)
}

/// Parse one input line into a pipeline.
///
/// The trailing `?` (auto-complete) and `&` (background) markers are read
/// off the raw line before tokenizing, so they apply to every stage.
/// Tokens never contain whitespace: quoting only strips one outer pair of
/// matching quotes from a single token.
pub fn parse(line: &str) -> Result<Pipeline, ParseError> {
    let mut text = line.trim_matches(SPLITTERS);
    let mut auto_complete = false;
    let mut background = false;

    if let Some(rest) = text.strip_suffix(AUTO_COMPLETE) {
        auto_complete = true;
        text = rest.trim_end_matches(SPLITTERS);
    } else if let Some(rest) = text.strip_suffix(BACKGROUND) {
        background = true;
        text = rest.trim_end_matches(SPLITTERS);
    }

    if text.is_empty() {
        return Ok(Pipeline {
            background,
            auto_complete,
            ..Pipeline::empty()
        });
    }

    let mut pipeline = Pipeline {
        stages: Vec::new(),
        background,
        auto_complete,
    };

    let mut tokens = text.split(SPLITTERS).filter(|t| !t.is_empty()).peekable();
    let mut current: Option<Command> = None;
    while let Some(token) = tokens.next() {
        if token == PIPE {
            let stage = current.take().ok_or(ParseError::EmptyStage)?;
            pipeline.stages.push(stage);
            continue;
        }
        match current.as_mut() {
            None => current = Some(Command::new(unquote(token)?)),
            Some(cmd) => apply_token(cmd, token, &mut tokens)?,
        }
    }
    pipeline
        .stages
        .push(current.ok_or(ParseError::EmptyStage)?);

    trace!("parsed {:?}", pipeline);
    Ok(pipeline)
}

fn apply_token<'a, I>(cmd: &mut Command, token: &'a str, rest: &mut Peekable<I>) -> Result<(), ParseError>
where
    I: Iterator<Item = &'a str>,
{
    if token == BACKGROUND_TOKEN {
        return Ok(());
    }

    if let Some(path) = token.strip_prefix('<') {
        cmd.redirect_in = Some(redirect_target(token, path, rest)?);
    } else if let Some(path) = token.strip_prefix(">>") {
        cmd.redirect_out = Some(OutputRedirect {
            path: redirect_target(token, path, rest)?,
            mode: OutputMode::Append,
        });
    } else if let Some(path) = token.strip_prefix('>') {
        cmd.redirect_out = Some(OutputRedirect {
            path: redirect_target(token, path, rest)?,
            mode: OutputMode::Truncate,
        });
    } else {
        cmd.push_arg(unquote(token)?);
    }
    Ok(())
}

/// The target is either glued to the marker (`>out`) or the next token
/// (`> out`). A marker followed by nothing usable is an error.
fn redirect_target<'a, I>(token: &str, inline: &'a str, rest: &mut Peekable<I>) -> Result<String, ParseError>
where
    I: Iterator<Item = &'a str>,
{
    if !inline.is_empty() {
        return Ok(unquote(inline)?.to_string());
    }
    match rest.next_if(|next| is_word(next)) {
        Some(next) => Ok(unquote(next)?.to_string()),
        None => Err(ParseError::MissingRedirectTarget(token.to_string())),
    }
}

fn is_word(token: &str) -> bool {
    token != PIPE && token != BACKGROUND_TOKEN && !token.starts_with(['<', '>'])
}

/// Strip one pair of matching outer quotes. `""` and `''` stay as written.
fn unquote(token: &str) -> Result<&str, ParseError> {
    let Some(open) = token.chars().next().filter(|c| matches!(c, '"' | '\'')) else {
        return Ok(token);
    };
    if token.len() < 2 || !token.ends_with(open) {
        return Err(ParseError::UnterminatedQuote(token.to_string()));
    }
    if token.len() == 2 {
        return Ok(token);
    }
    Ok(&token[1..token.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<&str> {
        cmd.args.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_empty_line() {
        for line in ["", "   ", " \t "] {
            let p = parse(line).unwrap();
            assert_eq!(p.len(), 1);
            assert!(p.is_empty());
            assert!(p.head().args.is_empty());
            assert!(!p.background);
        }
    }

    #[test]
    fn test_simple_command() {
        let p = parse("ls -l").unwrap();
        assert_eq!(p.len(), 1);
        assert_eq!(p.head().name, "ls");
        assert_eq!(args(p.head()), ["-l"]);
        assert_eq!(p.head().redirect_in, None);
        assert_eq!(p.head().redirect_out, None);
        assert!(!p.background);
        assert!(!p.auto_complete);
    }

    #[test]
    fn test_trims_and_collapses_whitespace() {
        let p = parse("\t  echo   a \t b  ").unwrap();
        assert_eq!(p.head().name, "echo");
        assert_eq!(args(p.head()), ["a", "b"]);
    }

    #[test]
    fn test_two_stage_pipe() {
        let p = parse("ls -l | wc -l").unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.stages[0].name, "ls");
        assert_eq!(args(&p.stages[0]), ["-l"]);
        assert_eq!(p.stages[1].name, "wc");
        assert_eq!(args(&p.stages[1]), ["-l"]);
    }

    #[test]
    fn test_three_stage_pipe_keeps_redirects_per_stage() {
        let p = parse("cat <in.txt | sort | uniq >out.txt").unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p.stages[0].redirect_in.as_deref(), Some("in.txt"));
        assert_eq!(p.stages[0].redirect_out, None);
        assert_eq!(p.stages[1].redirect_in, None);
        assert_eq!(p.stages[2].redirect_out_truncate(), Some("out.txt"));
    }

    #[test]
    fn test_redirects() {
        let p = parse("sort < in.txt > out.txt").unwrap();
        let cmd = p.head();
        assert_eq!(cmd.name, "sort");
        assert!(cmd.args.is_empty());
        assert_eq!(cmd.redirect_in.as_deref(), Some("in.txt"));
        assert_eq!(cmd.redirect_out_truncate(), Some("out.txt"));
        assert_eq!(cmd.redirect_out_append(), None);
    }

    #[test]
    fn test_glued_redirects() {
        let p = parse("sort <in.txt >out.txt -r").unwrap();
        let cmd = p.head();
        assert_eq!(args(cmd), ["-r"]);
        assert_eq!(cmd.redirect_in.as_deref(), Some("in.txt"));
        assert_eq!(cmd.redirect_out_truncate(), Some("out.txt"));
    }

    #[test]
    fn test_quoted_redirect_target() {
        let p = parse("cat > 'notes.txt'").unwrap();
        assert_eq!(p.head().redirect_out_truncate(), Some("notes.txt"));
    }

    #[test]
    fn test_append_and_background() {
        let p = parse("grep foo >> log.txt &").unwrap();
        assert!(p.background);
        assert_eq!(p.head().name, "grep");
        assert_eq!(args(p.head()), ["foo"]);
        assert_eq!(p.head().redirect_out_append(), Some("log.txt"));
    }

    #[test]
    fn test_background_without_space() {
        let p = parse("sleep 1&").unwrap();
        assert!(p.background);
        assert_eq!(args(p.head()), ["1"]);
    }

    #[test]
    fn test_background_applies_to_whole_pipeline() {
        let p = parse("yes | head -n 1 &").unwrap();
        assert!(p.background);
        assert_eq!(p.len(), 2);
        assert_eq!(args(&p.stages[1]), ["-n", "1"]);
    }

    #[test]
    fn test_inner_ampersand_token_is_skipped() {
        let p = parse("echo a & b").unwrap();
        assert!(!p.background);
        assert_eq!(args(p.head()), ["a", "b"]);
    }

    #[test]
    fn test_auto_complete_marker() {
        let p = parse("ca?").unwrap();
        assert!(p.auto_complete);
        assert_eq!(p.head().name, "ca");

        let p = parse("cat sr ?").unwrap();
        assert!(p.auto_complete);
        assert_eq!(args(p.head()), ["sr"]);
    }

    #[test]
    fn test_last_redirect_wins() {
        let p = parse("cmd >a >>b").unwrap();
        assert_eq!(p.head().redirect_out_append(), Some("b"));
        assert_eq!(p.head().redirect_out_truncate(), None);
    }

    #[test]
    fn test_quoted_args() {
        let p = parse("grep \"foo\" 'bar' \"\" x'y'").unwrap();
        assert_eq!(args(p.head()), ["foo", "bar", "\"\"", "x'y'"]);
    }

    #[test]
    fn test_quoted_arg_keeps_inner_quotes() {
        let p = parse("echo \"'a'\"").unwrap();
        assert_eq!(args(p.head()), ["'a'"]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            parse("echo \"abc").unwrap_err(),
            ParseError::UnterminatedQuote("\"abc".into())
        );
        assert!(matches!(
            parse("echo '").unwrap_err(),
            ParseError::UnterminatedQuote(_)
        ));
        assert_eq!(
            parse("\"ls -l").unwrap_err(),
            ParseError::UnterminatedQuote("\"ls".into())
        );
        assert_eq!(
            parse("ls | 'wc -l").unwrap_err(),
            ParseError::UnterminatedQuote("'wc".into())
        );
    }

    #[test]
    fn test_quoted_program_name() {
        let p = parse("'my tool' x").unwrap_err();
        assert_eq!(p, ParseError::UnterminatedQuote("'my".into()));
        let p = parse("\"ls\" -l").unwrap();
        assert_eq!(p.head().name, "ls");
        assert_eq!(args(p.head()), ["-l"]);
    }

    #[test]
    fn test_missing_redirect_target() {
        assert_eq!(
            parse("ls >").unwrap_err(),
            ParseError::MissingRedirectTarget(">".into())
        );
        assert_eq!(
            parse("ls >> | wc").unwrap_err(),
            ParseError::MissingRedirectTarget(">>".into())
        );
        assert_eq!(
            parse("sort < >out").unwrap_err(),
            ParseError::MissingRedirectTarget("<".into())
        );
        assert!(parse("sort <").is_err());
        assert!(parse("ls > &").is_err());
    }

    #[test]
    fn test_empty_stage() {
        assert_eq!(parse("ls |").unwrap_err(), ParseError::EmptyStage);
        assert_eq!(parse("| wc").unwrap_err(), ParseError::EmptyStage);
        assert_eq!(parse("ls | | wc").unwrap_err(), ParseError::EmptyStage);
    }

    #[test]
    fn test_is_auto_complete() {
        assert!(is_auto_complete("ls?"));
        assert!(is_auto_complete("cat 'no? \t"));
        assert!(is_auto_complete("ls | ?"));
        assert!(!is_auto_complete("ls \"b?\""));
        assert!(!is_auto_complete("sleep 1 &"));
    }

    #[test]
    fn test_reparse_of_display_is_equivalent() {
        let lines = [
            "ls -l",
            "ls -l | wc -l",
            "sort <in.txt >out.txt",
            "grep foo >>log.txt &",
            "echo \"|\" \"<x\" '>y' \"a&\" \"b?\" z",
            "cat a b | tr a-z A-Z | sort -r >>sorted.txt",
            "wc?",
            "cat >'out&'",
            "cat <'in?'",
            "cat >'\"q'",
            "cat >>'log&' | sort",
            "'run&' now",
        ];
        for line in lines {
            let first = parse(line).unwrap();
            let second = parse(&first.to_string()).unwrap();
            assert_eq!(first, second, "round trip of {line:?}");
        }
    }
}
