use serde_json::Value;

use crate::types::{camera_forward_direction, Direction, RelativeInput, Vec2};

/// Steering request. Relative inputs need the camera's forward direction.
#[derive(Debug, PartialEq)]
pub enum Steering {
    Absolute(Direction),
    Relative {
        input: RelativeInput,
        camera_forward: Direction,
    },
}

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Hello { name: String },
    Start,
    Input { steering: Steering },
    Boost { on: bool },
    ToggleAi,
    TogglePause,
    Weight { delta: i64 },
    Paint { from: Vec2, to: Vec2, erase: bool },
    Quit,
    Menu,
    Ping { t: f64 },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let name = object.get("name")?.as_str()?.to_string();
            Some(ParsedClientMessage::Hello { name })
        }
        "start" => Some(ParsedClientMessage::Start),
        "input" => {
            let dir = object.get("dir")?.as_str()?;
            let steering = match object.get("camera") {
                None => Steering::Absolute(Direction::parse(dir)?),
                Some(camera) => Steering::Relative {
                    input: RelativeInput::parse(dir)?,
                    camera_forward: parse_camera(camera)?,
                },
            };
            Some(ParsedClientMessage::Input { steering })
        }
        "boost" => {
            let on = object.get("on")?.as_bool()?;
            Some(ParsedClientMessage::Boost { on })
        }
        "toggle_ai" => Some(ParsedClientMessage::ToggleAi),
        "toggle_pause" => Some(ParsedClientMessage::TogglePause),
        "weight" => {
            let delta = object.get("delta")?.as_i64()?;
            Some(ParsedClientMessage::Weight { delta })
        }
        "paint" => {
            let from = parse_cell(object.get("from")?)?;
            let to = parse_cell(object.get("to")?)?;
            let erase = match object.get("erase") {
                None => false,
                Some(value) => value.as_bool()?,
            };
            Some(ParsedClientMessage::Paint { from, to, erase })
        }
        "quit" => Some(ParsedClientMessage::Quit),
        "menu" => Some(ParsedClientMessage::Menu),
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

/// `[x, y]` with integer coordinates. Range checks are left to the grid.
fn parse_cell(value: &Value) -> Option<Vec2> {
    let pair = value.as_array()?;
    if pair.len() != 2 {
        return None;
    }
    let x = i32::try_from(pair[0].as_i64()?).ok()?;
    let y = i32::try_from(pair[1].as_i64()?).ok()?;
    Some(Vec2::new(x, y))
}

/// Either a compass name or a `[dx, dz]` camera forward vector.
fn parse_camera(value: &Value) -> Option<Direction> {
    if let Some(name) = value.as_str() {
        return Direction::parse(name);
    }
    let pair = value.as_array()?;
    if pair.len() != 2 {
        return None;
    }
    let dx = pair[0].as_f64()?;
    let dz = pair[1].as_f64()?;
    if !dx.is_finite() || !dz.is_finite() || (dx == 0.0 && dz == 0.0) {
        return None;
    }
    Some(camera_forward_direction(dx as f32, dz as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hello_message() {
        let parsed = parse_client_message(r#"{"type":"hello","name":"A"}"#)
            .expect("hello message should parse");
        assert_eq!(
            parsed,
            ParsedClientMessage::Hello {
                name: "A".to_string()
            }
        );
    }

    #[test]
    fn parse_absolute_input() {
        let parsed = parse_client_message(r#"{"type":"input","dir":"west"}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Input {
                steering: Steering::Absolute(Direction::West)
            })
        );
    }

    #[test]
    fn parse_relative_input_with_camera_vector() {
        let parsed = parse_client_message(r#"{"type":"input","dir":"right","camera":[0.1,-0.9]}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Input {
                steering: Steering::Relative {
                    input: RelativeInput::Right,
                    camera_forward: Direction::North,
                }
            })
        );
    }

    #[test]
    fn parse_relative_input_with_named_camera() {
        let parsed = parse_client_message(r#"{"type":"input","dir":"back","camera":"east"}"#);
        assert!(matches!(
            parsed,
            Some(ParsedClientMessage::Input {
                steering: Steering::Relative {
                    input: RelativeInput::Back,
                    camera_forward: Direction::East,
                }
            })
        ));
    }

    #[test]
    fn parse_input_rejects_invalid_direction() {
        assert!(parse_client_message(r#"{"type":"input","dir":"invalid"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input","dir":"forward"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input","dir":"left","camera":[0,0]}"#).is_none());
    }

    #[test]
    fn parse_paint_message() {
        let parsed =
            parse_client_message(r#"{"type":"paint","from":[1,2],"to":[5,2],"erase":true}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Paint {
                from: Vec2::new(1, 2),
                to: Vec2::new(5, 2),
                erase: true,
            })
        );
        let parsed = parse_client_message(r#"{"type":"paint","from":[1,2],"to":[5,2]}"#);
        assert!(matches!(
            parsed,
            Some(ParsedClientMessage::Paint { erase: false, .. })
        ));
    }

    #[test]
    fn parse_paint_rejects_bad_cells() {
        assert!(parse_client_message(r#"{"type":"paint","from":[1],"to":[5,2]}"#).is_none());
        assert!(parse_client_message(r#"{"type":"paint","from":[1.5,2],"to":[5,2]}"#).is_none());
        assert!(
            parse_client_message(r#"{"type":"paint","from":[1,2],"to":[9999999999,2]}"#).is_none()
        );
    }

    #[test]
    fn parse_simple_toggles() {
        assert_eq!(
            parse_client_message(r#"{"type":"toggle_ai"}"#),
            Some(ParsedClientMessage::ToggleAi)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"boost","on":true}"#),
            Some(ParsedClientMessage::Boost { on: true })
        );
        assert_eq!(
            parse_client_message(r#"{"type":"weight","delta":-2}"#),
            Some(ParsedClientMessage::Weight { delta: -2 })
        );
        assert!(parse_client_message(r#"{"type":"weight","delta":0.5}"#).is_none());
        assert!(parse_client_message(r#"{"type":"unknown"}"#).is_none());
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        let parsed = parse_client_message(r#"{"type":"ping","t":12.5}"#);
        assert!(matches!(parsed, Some(ParsedClientMessage::Ping { .. })));
        assert!(parse_client_message(r#"{"type":"ping","t":"x"}"#).is_none());
    }
}
