use serde_json::Value;

use crate::types::{Direction, GameMode, PointerInput};

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Hello {
        mode: Option<GameMode>,
        seed: Option<i64>,
    },
    Input {
        dir: Direction,
    },
    Pointer {
        input: PointerInput,
    },
    Reset,
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let mode = match object.get("mode") {
                None => None,
                Some(value) => Some(GameMode::parse(value.as_str()?)?),
            };
            let seed = parse_optional_i64(object.get("seed"))?;
            Some(ParsedClientMessage::Hello { mode, seed })
        }
        "input" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            Some(ParsedClientMessage::Input { dir })
        }
        "pointer" => {
            let x = parse_finite_f32(object.get("x")?)?;
            let y = parse_finite_f32(object.get("y")?)?;
            let relative = match object.get("relative") {
                None => false,
                Some(value) => value.as_bool()?,
            };
            let input = if relative {
                PointerInput::Relative { dx: x, dy: y }
            } else {
                PointerInput::Absolute { x, y }
            };
            Some(ParsedClientMessage::Pointer { input })
        }
        "reset" => Some(ParsedClientMessage::Reset),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn parse_finite_f32(value: &Value) -> Option<f32> {
    let number = value.as_f64()?;
    if !number.is_finite() || number.abs() > f32::MAX as f64 {
        return None;
    }
    Some(number as f32)
}

fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    const MAX_SAFE_INTEGER_F64: f64 = 9_007_199_254_740_991.0;

    let Some(value) = value else {
        return Some(None);
    };
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    if let Some(number) = value.as_u64() {
        return i64::try_from(number).ok().map(Some);
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite() {
            let floored = number.floor();
            if floored.abs() > MAX_SAFE_INTEGER_F64 {
                return None;
            }
            return Some(Some(floored as i64));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hello_message() {
        let parsed = parse_client_message(r#"{"type":"hello","mode":"falling","seed":42}"#)
            .expect("hello message should parse");
        assert_eq!(
            parsed,
            ParsedClientMessage::Hello {
                mode: Some(GameMode::Falling),
                seed: Some(42),
            }
        );
    }

    #[test]
    fn parse_bare_hello_uses_defaults() {
        let parsed = parse_client_message(r#"{"type":"hello"}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Hello {
                mode: None,
                seed: None,
            })
        );
    }

    #[test]
    fn parse_hello_rejects_unknown_mode() {
        assert!(parse_client_message(r#"{"type":"hello","mode":"pinball"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"hello","mode":3}"#).is_none());
    }

    #[test]
    fn parse_input_message() {
        let parsed = parse_client_message(r#"{"type":"input","dir":"left"}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Input {
                dir: Direction::Left
            })
        );
    }

    #[test]
    fn parse_input_rejects_invalid_direction() {
        assert!(parse_client_message(r#"{"type":"input","dir":"invalid"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input"}"#).is_none());
    }

    #[test]
    fn parse_pointer_absolute_and_relative() {
        let parsed = parse_client_message(r#"{"type":"pointer","x":45,"y":25.5}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Pointer {
                input: PointerInput::Absolute { x: 45.0, y: 25.5 }
            })
        );

        let parsed = parse_client_message(r#"{"type":"pointer","x":-30,"y":2,"relative":true}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Pointer {
                input: PointerInput::Relative { dx: -30.0, dy: 2.0 }
            })
        );
    }

    #[test]
    fn parse_pointer_rejects_bad_coordinates() {
        assert!(parse_client_message(r#"{"type":"pointer","x":"1","y":2}"#).is_none());
        assert!(parse_client_message(r#"{"type":"pointer","x":1}"#).is_none());
        assert!(parse_client_message(r#"{"type":"pointer","x":1e300,"y":2}"#).is_none());
        assert!(
            parse_client_message(r#"{"type":"pointer","x":1,"y":2,"relative":"yes"}"#).is_none()
        );
    }

    #[test]
    fn parse_reset_message() {
        assert_eq!(
            parse_client_message(r#"{"type":"reset"}"#),
            Some(ParsedClientMessage::Reset)
        );
    }

    #[test]
    fn parse_ping_requires_number() {
        let parsed = parse_client_message(r#"{"type":"ping","t":12.5}"#);
        assert!(matches!(parsed, Some(ParsedClientMessage::Ping { .. })));
        assert!(parse_client_message(r#"{"type":"ping","t":"now"}"#).is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_client_message("not json").is_none());
        assert!(parse_client_message("[1,2]").is_none());
        assert!(parse_client_message(r#"{"type":"lobby_start"}"#).is_none());
    }

    #[test]
    fn parse_hello_seed_floors_and_rejects_overflow() {
        let parsed = parse_client_message(r#"{"type":"hello","seed":7.9}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Hello {
                mode: None,
                seed: Some(7),
            })
        );
        assert!(parse_client_message(r#"{"type":"hello","seed":18446744073709551615}"#).is_none());
        assert!(parse_client_message(r#"{"type":"hello","seed":1e100}"#).is_none());
    }
}
