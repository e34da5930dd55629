//! Macros: named instruction sequences compiled once at load time.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;

use crate::catalog::Catalog;
use crate::error::{ProxyError, Result};
use crate::message::{Instruction, Message};

/// A macro as it appears in the configuration file, e.g.
///
/// ```json
/// [{"name": "media_on",
///   "instructions": ["sendcommand livingroom tv_on", "pause 3000",
///                    "sendcommand livingroom amp_on"]}]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Macro {
    pub name: String,
    pub instructions: Vec<String>,
}

/// Compile all macros into ready-to-enqueue messages. Every room and
/// command reference is resolved now; any malformed instruction is a fatal
/// load-time error.
pub fn compile(reader: impl Read, catalog: &Catalog) -> Result<HashMap<String, Message>> {
    let macros: Vec<Macro> =
        serde_json::from_reader(reader).map_err(|e| ProxyError::json("macros", e))?;

    let mut compiled = HashMap::new();
    for macro_def in macros {
        let mut message = Message::new();
        for line in &macro_def.instructions {
            message.push(compile_instruction(line, catalog)?);
        }
        compiled.insert(macro_def.name, message);
    }
    Ok(compiled)
}

fn compile_instruction(line: &str, catalog: &Catalog) -> Result<Instruction> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("sendcommand") => {
            let (Some(room), Some(command), None) =
                (tokens.next(), tokens.next(), tokens.next())
            else {
                return Err(ProxyError::InvalidInstruction(line.to_string()));
            };
            let (target, data) = catalog.resolve(room, command)?;
            Ok(Instruction::SendCode {
                target: target.to_string(),
                data: data.to_string(),
            })
        }
        Some("pause") => {
            let (Some(interval), None) = (tokens.next(), tokens.next()) else {
                return Err(ProxyError::InvalidInstruction(line.to_string()));
            };
            let ms = interval
                .parse::<u64>()
                .map_err(|_| ProxyError::InvalidPauseInterval(interval.to_string()))?;
            Ok(Instruction::Pause { ms })
        }
        _ => Err(ProxyError::InvalidInstruction(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let commands = r#"[
            {"group": "tv", "command": "on", "data": "2600aa"},
            {"group": "tv", "command": "off", "data": "2600bb"}
        ]"#;
        let rooms = r#"[{"name": "living", "host": "192.168.1.40", "groups": ["tv"]}]"#;
        Catalog::load(commands.as_bytes(), rooms.as_bytes()).unwrap()
    }

    #[test]
    fn test_compile_resolves_and_orders() {
        let macros = r#"[{"name": "cycle",
            "instructions": ["sendcommand living on", "pause 250", "sendcommand living off"]}]"#;
        let compiled = compile(macros.as_bytes(), &catalog()).unwrap();

        let message = &compiled["cycle"];
        assert_eq!(
            message.instructions(),
            &[
                Instruction::SendCode {
                    target: "192.168.1.40".to_string(),
                    data: "2600aa".to_string()
                },
                Instruction::Pause { ms: 250 },
                Instruction::SendCode {
                    target: "192.168.1.40".to_string(),
                    data: "2600bb".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_unknown_verb_fails_at_load() {
        let macros = r#"[{"name": "m", "instructions": ["transmit living on"]}]"#;
        assert!(matches!(
            compile(macros.as_bytes(), &catalog()),
            Err(ProxyError::InvalidInstruction(_))
        ));
    }

    #[test]
    fn test_wrong_argument_count_fails_at_load() {
        for bad in ["sendcommand living", "sendcommand living on extra", "pause", "pause 5 6"] {
            let macros = format!(r#"[{{"name": "m", "instructions": ["{bad}"]}}]"#);
            assert!(
                matches!(
                    compile(macros.as_bytes(), &catalog()),
                    Err(ProxyError::InvalidInstruction(_))
                ),
                "{bad:?} should fail"
            );
        }
    }

    #[test]
    fn test_non_integer_pause_fails_at_load() {
        for bad in ["pause abc", "pause -1", "pause 2.5"] {
            let macros = format!(r#"[{{"name": "m", "instructions": ["{bad}"]}}]"#);
            assert!(
                matches!(
                    compile(macros.as_bytes(), &catalog()),
                    Err(ProxyError::InvalidPauseInterval(_))
                ),
                "{bad:?} should fail"
            );
        }
    }

    #[test]
    fn test_unresolved_room_fails_at_load() {
        let macros = r#"[{"name": "m", "instructions": ["sendcommand bedroom on"]}]"#;
        assert!(matches!(
            compile(macros.as_bytes(), &catalog()),
            Err(ProxyError::UnknownRoom(_))
        ));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let macros = r#"[{"name": "m", "instructions": [], "loop": true}]"#;
        assert!(matches!(
            compile(macros.as_bytes(), &catalog()),
            Err(ProxyError::Json { stream: "macros", .. })
        ));
    }
}
