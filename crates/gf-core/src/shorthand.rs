//! One-line pair syntax used on the command line.
//!
//! ```text
//! title -> 12:34
//! genres -> 12:35 as text | join=" / " | upper
//! title -> 12:34 | truncate=18 | fallback="Untitled"
//! imageUrl -> 12:40 as image
//! ```
//!
//! The kind is optional; callers fill it in from the target layer.

use crate::id::LayerId;
use crate::mapping::PairKind;
use crate::transform::Transform;
use winnow::ascii::{digit1, space0, space1};
use winnow::combinator::{alt, delimited, opt, preceded};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

/// A parsed shorthand pair. `kind` is `None` when the text omitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct PairShorthand {
    pub field: String,
    pub layer_id: LayerId,
    pub kind: Option<PairKind>,
    pub transform: Option<Transform>,
}

/// Parse one shorthand pair.
#[must_use = "parsing result should be used"]
pub fn parse_pair(input: &str) -> Result<PairShorthand, String> {
    let mut rest = input.trim();
    let pair = parse_pair_line
        .parse_next(&mut rest)
        .map_err(|e| format!("Pair parse error in `{input}`: {e}"))?;
    if !rest.trim().is_empty() {
        return Err(format!("Unexpected trailing input `{}` in `{input}`", rest.trim()));
    }
    Ok(pair)
}

fn parse_pair_line(input: &mut &str) -> ModalResult<PairShorthand> {
    let field = parse_field.parse_next(input)?;
    let _ = (space0, "->", space0).parse_next(input)?;
    let layer = take_till(1.., |c: char| c.is_whitespace() || c == '|')
        .verify(|id: &str| LayerId::parse(id).is_ok())
        .parse_next(input)?;
    let kind = opt(preceded((space1, "as", space1), parse_kind)).parse_next(input)?;

    let mut transform = Transform::default();
    loop {
        let _ = space0.parse_next(input)?;
        if !input.starts_with('|') {
            break;
        }
        *input = &input[1..];
        let _ = space0.parse_next(input)?;
        parse_option(input, &mut transform)?;
    }

    Ok(PairShorthand {
        field: field.to_string(),
        layer_id: LayerId::intern(layer),
        kind,
        transform: (!transform.is_identity()).then_some(transform),
    })
}

fn parse_field<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.').parse_next(input)
}

fn parse_kind(input: &mut &str) -> ModalResult<PairKind> {
    alt(("text".value(PairKind::Text), "image".value(PairKind::Image))).parse_next(input)
}

fn parse_option(input: &mut &str, transform: &mut Transform) -> ModalResult<()> {
    if input.starts_with("truncate") {
        let digits = preceded(("truncate", space0, '=', space0), digit1).parse_next(input)?;
        transform.truncate = Some(
            digits
                .parse::<usize>()
                .map_err(|_| winnow::error::ErrMode::Cut(ContextError::new()))?,
        );
    } else if input.starts_with("join") {
        let sep = preceded(("join", space0, '=', space0), parse_value).parse_next(input)?;
        transform.join = Some(sep);
    } else if input.starts_with("fallback") {
        let text = preceded(("fallback", space0, '=', space0), parse_value).parse_next(input)?;
        transform.fallback = Some(text);
    } else {
        let _ = alt(("uppercase", "upper")).parse_next(input)?;
        transform.uppercase = true;
    }
    Ok(())
}

/// A quoted string (spaces kept) or a bare word up to the next `|`.
fn parse_value(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_till(0.., '"'), '"').map(|s: &str| s.to_string()),
        take_till(1.., '|').map(|s: &str| s.trim_end().to_string()),
    ))
    .parse_next(input)
}
