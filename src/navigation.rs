use schemars::{JsonSchema, r#gen::SchemaSettings};
use serde::{Deserialize, Serialize};

/// System prompt of the navigation model variant.
pub const NAVIGATION_SYSTEM_PROMPT: &str = r#"You are an autonomous navigation controller for a car. Based on the camera image, your task is to decide the car's next movement to avoid obstacles and explore the world. Output a concise JSON command with these keys only:
- "m": movement command ("F" for forward, "B" for backward, "L" for left, "R" for right, "S" for stop),
- "s": speed as a percentage (0-100),
- "t": turn angle in degrees (0 if not turning),
- "d": duration in seconds.

Do not include any extra text. Output exactly one valid JSON object."#;

/// Upper bound of the speed percentage `s`.
pub const MAX_SPEED: f64 = 100.0;
/// Upper bound of the turn angle `t` in degrees.
pub const MAX_TURN: f64 = 360.0;

/// Movement letter of a [`CarMovementCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum Movement {
    F,
    B,
    L,
    R,
    S,
}

impl Movement {
    /// Human readable name of the movement.
    pub fn as_str(&self) -> &'static str {
        match self {
            Movement::F => "forward",
            Movement::B => "backward",
            Movement::L => "left",
            Movement::R => "right",
            Movement::S => "stop",
        }
    }
}

/// A single movement decision produced by the navigation model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct CarMovementCommand {
    /// Movement command: 'F' for forward, 'B' for backward, 'L' for left, 'R' for right, 'S' for stop.
    pub m: Movement,
    /// Speed as a percentage (0-100).
    #[schemars(range(min = 0, max = 100))]
    pub s: f64,
    /// Turn angle in degrees (0 if not turning).
    #[schemars(range(min = 0, max = 360))]
    pub t: f64,
    /// Duration in seconds for executing the action.
    #[schemars(range(min = 0))]
    pub d: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("command is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field '{field}' is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

impl CarMovementCommand {
    /// Parses a command from the model's textual response and checks its ranges.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let command: Self = serde_json::from_str(text.trim())?;
        command.validate()?;
        Ok(command)
    }

    /// Checks `s`, `t` and `d` against the bounds declared in the schema.
    pub fn validate(&self) -> Result<(), CommandError> {
        let checks = [
            ("s", self.s, 0.0..=MAX_SPEED),
            ("t", self.t, 0.0..=MAX_TURN),
            ("d", self.d, 0.0..=f64::MAX),
        ];
        for (field, value, range) in checks {
            if !value.is_finite() || !range.contains(&value) {
                return Err(CommandError::OutOfRange { field, value });
            }
        }
        Ok(())
    }
}

/// JSON schema handed to the runtime to constrain decoding.
///
/// Subschemas are inlined so the result is a single self-contained object.
pub fn command_schema() -> serde_json::Value {
    let generator = SchemaSettings::draft07()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<CarMovementCommand>();
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
}
