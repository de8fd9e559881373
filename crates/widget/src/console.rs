use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use domain::{Attachment, AttachmentKind, Comment, CommentId};
use viewmodel::{Command, ViewModel};

pub const USAGE: &str = "\
commands:
  page N | next | prev | refresh
  sort name|email|date
  form | close
  set name|email|home|text VALUE
  answer TEXT
  reply ID|none
  attach image|file PATH
  detach image|file
  wrap i|strong|code START END
  submit | help | quit";

/// One parsed line of console input.
#[derive(Debug)]
pub enum Input {
    Command(Command),
    /// Needs the file read before it becomes a [`Command::Attach`].
    Attach(AttachmentKind, PathBuf),
    Help,
    Quit,
}

/// Parses a console line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = split_word(line);

    let input = match verb {
        "page" => {
            let page = rest
                .parse::<u32>()
                .map_err(|_| format!("invalid page number '{}'", rest))?;
            Input::Command(Command::LoadPage(page))
        }
        "next" => Input::Command(Command::NextPage),
        "prev" => Input::Command(Command::PrevPage),
        "refresh" => Input::Command(Command::Refresh),
        "sort" => Input::Command(Command::Sort(rest.parse()?)),
        "form" => Input::Command(Command::OpenForm),
        "close" => Input::Command(Command::CloseForm),
        "set" => {
            let (field, value) = split_word(rest);
            Input::Command(Command::Edit(field.parse()?, value.to_string()))
        }
        "answer" => Input::Command(Command::CaptchaAnswer(rest.to_string())),
        "reply" => match rest {
            "" => return Err("reply needs a comment id or 'none'".into()),
            "none" => Input::Command(Command::ReplyTo(None)),
            id => Input::Command(Command::ReplyTo(Some(CommentId::new(id)))),
        },
        "attach" => {
            let (kind, path) = split_word(rest);
            if path.is_empty() {
                return Err("attach needs a path".into());
            }
            Input::Attach(parse_kind(kind)?, PathBuf::from(path))
        }
        "detach" => Input::Command(Command::Detach(parse_kind(rest)?)),
        "wrap" => {
            let mut parts = rest.split_whitespace();
            let (Some(tag), Some(start), Some(end), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Err("usage: wrap i|strong|code START END".into());
            };
            let start = start
                .parse::<usize>()
                .map_err(|_| format!("invalid offset '{}'", start))?;
            let end = end
                .parse::<usize>()
                .map_err(|_| format!("invalid offset '{}'", end))?;
            Input::Command(Command::Wrap(tag.parse()?, start..end))
        }
        "submit" => Input::Command(Command::Submit),
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };

    Ok(Some(input))
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (s, ""),
    }
}

fn parse_kind(s: &str) -> Result<AttachmentKind, String> {
    match s {
        "image" => Ok(AttachmentKind::Image),
        "file" => Ok(AttachmentKind::TextFile),
        other => Err(format!("unknown attachment kind '{}'", other)),
    }
}

/// Reads `path` from disk and validates it as the given attachment kind.
pub async fn load_attachment(kind: AttachmentKind, path: &Path) -> anyhow::Result<Attachment> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let attachment = match kind {
        AttachmentKind::Image => Attachment::image(file_name, bytes)?,
        AttachmentKind::TextFile => Attachment::text_file(file_name, bytes)?,
    };
    Ok(attachment)
}

pub fn render(model: &ViewModel) -> String {
    let mut out = String::new();
    let cursor = model.cursor();

    let _ = write!(out, "== page {}/{}", cursor.page, cursor.total_pages);
    if let Some(sort) = cursor.sort {
        let _ = write!(out, " | sorted by {}", sort);
    }
    out.push_str(if model.live_connected() {
        " | live\n"
    } else {
        " | offline\n"
    });

    if model.forest().is_empty() {
        out.push_str("(no comments)\n");
    }
    render_forest(model.forest(), &mut out);

    if model.form_open() {
        render_form(model, &mut out);
    }
    if let Some(message) = model.error_message() {
        let _ = writeln!(out, "!! {}", message);
    }
    out
}

fn render_forest(forest: &[Comment], out: &mut String) {
    let mut stack: Vec<(usize, &Comment)> = forest.iter().rev().map(|c| (0, c)).collect();

    while let Some((depth, comment)) = stack.pop() {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{}#{} {}", indent, comment.id, comment.user_name);
        if !comment.email.is_empty() {
            let _ = write!(out, " <{}>", comment.email);
        }
        if let Some(at) = comment.created_at {
            let _ = write!(out, " {}", at.format("%H:%M %d.%m.%Y"));
        }
        out.push('\n');
        for line in comment.text.lines() {
            let _ = writeln!(out, "{}  {}", indent, line);
        }
        if let Some(image) = &comment.image {
            let _ = writeln!(out, "{}  [image] {}", indent, image);
        }
        if let Some(file) = &comment.text_file {
            let _ = writeln!(out, "{}  [file] {}", indent, file);
        }

        stack.extend(comment.children.iter().rev().map(|c| (depth + 1, c)));
    }
}

fn render_form(model: &ViewModel, out: &mut String) {
    let draft = model.draft();
    out.push_str("-- new comment");
    if let Some(parent) = &draft.parent_comment {
        let _ = write!(out, " (reply to #{})", parent);
    }
    out.push('\n');
    let _ = writeln!(out, "   name: {}", draft.user_name);
    let _ = writeln!(out, "   email: {}", draft.email);
    let _ = writeln!(out, "   home: {}", draft.home_page);
    let _ = writeln!(out, "   text: {}", draft.text);
    for attachment in [&draft.image, &draft.text_file].into_iter().flatten() {
        let _ = writeln!(
            out,
            "   attached: {} ({} bytes)",
            attachment.file_name,
            attachment.bytes.len()
        );
    }
    match &draft.captcha {
        Some(captcha) => {
            let _ = writeln!(out, "   captcha: {} -> {}", captcha.value, draft.captcha_answer);
        }
        None => out.push_str("   captcha: loading...\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{AttachmentNormalizer, DraftField, InlineTag, SortBy};

    fn parse(line: &str) -> Input {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn parses_navigation_commands() {
        assert!(matches!(parse("page 3"), Input::Command(Command::LoadPage(3))));
        assert!(matches!(parse("  next "), Input::Command(Command::NextPage)));
        assert!(matches!(
            parse("sort email"),
            Input::Command(Command::Sort(SortBy::Email))
        ));
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("page two").is_err());
        assert!(parse_line("sort likes").is_err());
    }

    #[test]
    fn set_keeps_the_rest_of_the_line() {
        match parse("set text hello  <i>there</i>") {
            Input::Command(Command::Edit(DraftField::Text, value)) => {
                assert_eq!(value, "hello  <i>there</i>");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_reply_wrap_and_attachments() {
        assert!(matches!(parse("reply none"), Input::Command(Command::ReplyTo(None))));
        match parse("reply 42") {
            Input::Command(Command::ReplyTo(Some(id))) => assert_eq!(id.as_str(), "42"),
            other => panic!("unexpected {:?}", other),
        }
        match parse("wrap strong 2 5") {
            Input::Command(Command::Wrap(InlineTag::Strong, range)) => assert_eq!(range, 2..5),
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_line("wrap strong 2").is_err());
        match parse("attach file /tmp/notes.txt") {
            Input::Attach(AttachmentKind::TextFile, path) => {
                assert_eq!(path, PathBuf::from("/tmp/notes.txt"))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_line("attach image").is_err());
        assert!(matches!(parse("quit"), Input::Quit));
    }

    #[tokio::test]
    async fn attachment_is_read_and_validated() {
        let dir = std::env::temp_dir();
        let txt = dir.join("threadview-console-test.txt");
        tokio::fs::write(&txt, b"notes").await.unwrap();

        let attachment = load_attachment(AttachmentKind::TextFile, &txt).await.unwrap();
        assert_eq!(attachment.file_name, "threadview-console-test.txt");
        assert_eq!(attachment.bytes, b"notes");

        assert!(load_attachment(AttachmentKind::Image, &txt).await.is_err());
        let _ = tokio::fs::remove_file(&txt).await;
    }

    #[test]
    fn renders_the_forest_as_an_indented_tree() {
        let mut model = ViewModel::new(AttachmentNormalizer::cloudinary("demo"));
        let mut root = Comment::root("1");
        root.user_name = "ann".into();
        root.text = "first".into();
        let mut reply = Comment::reply("2", "1");
        reply.user_name = "bob".into();
        reply.text = "answer".into();
        model.merge_new_comment(root);
        model.merge_new_comment(reply);

        let out = render(&model);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "== page 1/1 | offline");
        assert_eq!(lines[1], "#1 ann");
        assert_eq!(lines[2], "  first");
        assert_eq!(lines[3], "  #2 bob");
        assert_eq!(lines[4], "    answer");
    }

    #[test]
    fn renders_the_open_form() {
        let mut model = ViewModel::new(AttachmentNormalizer::cloudinary("demo"));
        model.open_form();
        model.draft_mut().set(DraftField::UserName, "ann");
        model.show_error("Invalid captcha");

        let out = render(&model);
        assert!(out.contains("(no comments)"));
        assert!(out.contains("   name: ann"));
        assert!(out.contains("captcha: loading..."));
        assert!(out.ends_with("!! Invalid captcha\n"));
    }
}
