//! Block scanning for {{#if}} and {{#each}} sections
//!
//! Blocks are matched left to right. A block's body runs to the first
//! closing tag after its opener, so blocks never nest: an inner opener is
//! plain text inside the outer body and the outer closing tag is left over
//! as literal text.

/// A matched `{{#keyword ident}}body{{/keyword}}` span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    pub ident: &'a str,
    pub body: &'a str,
}

/// Replace every block of the given keyword with the output of `render`.
///
/// Text outside blocks, openers that are not well formed and openers
/// without a closing tag are copied through unchanged.
pub fn rewrite_blocks<F>(content: &str, keyword: &str, mut render: F) -> String
where
    F: FnMut(Block<'_>) -> String,
{
    let opener = format!("{{{{#{}", keyword);
    let closer = format!("{{{{/{}}}}}", keyword);

    let mut out = String::with_capacity(content.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(found) = content[search..].find(&opener) {
        let start = search + found;

        let Some((ident, body_start)) = parse_opener(content, start + opener.len()) else {
            // Openers start with an ASCII brace, so start + 1 is a char boundary
            search = start + 1;
            continue;
        };

        // No closing tag after this opener means none after any later one
        let Some(body_len) = content[body_start..].find(&closer) else {
            break;
        };

        let body = &content[body_start..body_start + body_len];
        out.push_str(&content[copied..start]);
        out.push_str(&render(Block { ident, body }));

        copied = body_start + body_len + closer.len();
        search = copied;
    }

    out.push_str(&content[copied..]);
    out
}

/// Parse `\s+ident\s*}}` starting right after the opener keyword.
///
/// Returns the identifier and the byte offset where the body begins.
fn parse_opener(content: &str, from: usize) -> Option<(&str, usize)> {
    let rest = &content[from..];
    let after_ws = rest.trim_start();
    if after_ws.len() == rest.len() {
        return None;
    }

    let ident_len = after_ws
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if ident_len == 0 {
        return None;
    }

    let ident = &after_ws[..ident_len];
    let tail = after_ws[ident_len..].trim_start();
    let tail = tail.strip_prefix("}}")?;

    Some((ident, content.len() - tail.len()))
}
