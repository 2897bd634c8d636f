//! The command log: an ordered record of drawing calls and style changes.
//!
//! Entries use the same JSON shape as browser-side call stacks:
//! `{"property": name, "value": v}` for style assignments and
//! `{"method": name, "args": [...]}` for calls. Anything this build does not
//! understand is kept as [`Command::Unsupported`] so it survives a round trip.

use crate::style::StyleProperty;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ASYNC_BEGIN: &str = "addAsync";
const ASYNC_END: &str = "removeAsync";

/// A drawing primitive with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    QuadraticCurveTo { cpx: f64, cpy: f64, x: f64, y: f64 },
    BeginPath,
    ClosePath,
    Stroke,
    Fill,
    FillRect { x: f64, y: f64, width: f64, height: f64 },
    StrokeRect { x: f64, y: f64, width: f64, height: f64 },
    ClearRect { x: f64, y: f64, width: f64, height: f64 },
    FillCircle { x: f64, y: f64, radius: f64 },
    StrokeCircle { x: f64, y: f64, radius: f64 },
    /// Draw an already-decoded image. `src` is whatever the decoder accepts,
    /// typically a `data:` URL.
    DrawImage { src: String, x: f64, y: f64, width: f64, height: f64 },
}

impl Primitive {
    pub fn method(&self) -> &'static str {
        match self {
            Primitive::MoveTo { .. } => "moveTo",
            Primitive::LineTo { .. } => "lineTo",
            Primitive::QuadraticCurveTo { .. } => "quadraticCurveTo",
            Primitive::BeginPath => "beginPath",
            Primitive::ClosePath => "closePath",
            Primitive::Stroke => "stroke",
            Primitive::Fill => "fill",
            Primitive::FillRect { .. } => "fillRect",
            Primitive::StrokeRect { .. } => "strokeRect",
            Primitive::ClearRect { .. } => "clearRect",
            Primitive::FillCircle { .. } => "fillCircle",
            Primitive::StrokeCircle { .. } => "strokeCircle",
            Primitive::DrawImage { .. } => "drawImage",
        }
    }

    pub fn args(&self) -> Vec<Value> {
        let nums = |vals: &[f64]| vals.iter().map(|v| Value::from(*v)).collect();
        match self {
            Primitive::MoveTo { x, y } | Primitive::LineTo { x, y } => nums(&[*x, *y]),
            Primitive::QuadraticCurveTo { cpx, cpy, x, y } => nums(&[*cpx, *cpy, *x, *y]),
            Primitive::BeginPath | Primitive::ClosePath | Primitive::Stroke | Primitive::Fill => {
                Vec::new()
            }
            Primitive::FillRect { x, y, width, height }
            | Primitive::StrokeRect { x, y, width, height }
            | Primitive::ClearRect { x, y, width, height } => nums(&[*x, *y, *width, *height]),
            Primitive::FillCircle { x, y, radius } | Primitive::StrokeCircle { x, y, radius } => {
                nums(&[*x, *y, *radius])
            }
            Primitive::DrawImage { src, x, y, width, height } => {
                let mut args = vec![Value::from(src.as_str())];
                args.extend(nums(&[*x, *y, *width, *height]));
                args
            }
        }
    }

    /// Parse a call entry. `None` when the method is unknown or the arguments don't fit.
    pub fn from_call(method: &str, args: &[Value]) -> Option<Self> {
        let num = |i: usize| args.get(i).and_then(Value::as_f64);
        let prim = match method {
            "moveTo" => Primitive::MoveTo { x: num(0)?, y: num(1)? },
            "lineTo" => Primitive::LineTo { x: num(0)?, y: num(1)? },
            "quadraticCurveTo" => Primitive::QuadraticCurveTo {
                cpx: num(0)?,
                cpy: num(1)?,
                x: num(2)?,
                y: num(3)?,
            },
            "beginPath" => Primitive::BeginPath,
            "closePath" => Primitive::ClosePath,
            "stroke" => Primitive::Stroke,
            "fill" => Primitive::Fill,
            "fillRect" => Primitive::FillRect {
                x: num(0)?,
                y: num(1)?,
                width: num(2)?,
                height: num(3)?,
            },
            "strokeRect" => Primitive::StrokeRect {
                x: num(0)?,
                y: num(1)?,
                width: num(2)?,
                height: num(3)?,
            },
            "clearRect" => Primitive::ClearRect {
                x: num(0)?,
                y: num(1)?,
                width: num(2)?,
                height: num(3)?,
            },
            "fillCircle" => Primitive::FillCircle { x: num(0)?, y: num(1)?, radius: num(2)? },
            "strokeCircle" => Primitive::StrokeCircle { x: num(0)?, y: num(1)?, radius: num(2)? },
            "drawImage" => Primitive::DrawImage {
                src: args.first()?.as_str()?.to_string(),
                x: num(1)?,
                y: num(2)?,
                width: num(3)?,
                height: num(4)?,
            },
            _ => return None,
        };
        Some(prim)
    }
}

/// One raw log entry as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCommand {
    Property { property: String, value: Value },
    Method {
        method: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

/// A command log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCommand", into = "RawCommand")]
pub enum Command {
    SetProperty(StyleProperty),
    Call(Primitive),
    /// An asynchronous operation started; its result lands later in the log.
    AsyncBegin,
    /// A matching asynchronous operation finished (successfully or not).
    AsyncEnd,
    /// An entry this build cannot interpret, preserved verbatim.
    Unsupported(RawCommand),
}

impl From<RawCommand> for Command {
    fn from(raw: RawCommand) -> Self {
        match &raw {
            RawCommand::Property { property, value } => {
                match StyleProperty::from_parts(property, value) {
                    Some(prop) => Command::SetProperty(prop),
                    None => Command::Unsupported(raw),
                }
            }
            RawCommand::Method { method, args } => match method.as_str() {
                ASYNC_BEGIN => Command::AsyncBegin,
                ASYNC_END => Command::AsyncEnd,
                _ => match Primitive::from_call(method, args) {
                    Some(prim) => Command::Call(prim),
                    None => Command::Unsupported(raw),
                },
            },
        }
    }
}

impl From<Command> for RawCommand {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::SetProperty(prop) => RawCommand::Property {
                property: prop.name().to_string(),
                value: prop.value(),
            },
            Command::Call(prim) => RawCommand::Method {
                method: prim.method().to_string(),
                args: prim.args(),
            },
            Command::AsyncBegin => RawCommand::Method {
                method: ASYNC_BEGIN.to_string(),
                args: Vec::new(),
            },
            Command::AsyncEnd => RawCommand::Method {
                method: ASYNC_END.to_string(),
                args: Vec::new(),
            },
            Command::Unsupported(raw) => raw,
        }
    }
}

impl From<Primitive> for Command {
    fn from(prim: Primitive) -> Self {
        Command::Call(prim)
    }
}

impl From<StyleProperty> for Command {
    fn from(prop: StyleProperty) -> Self {
        Command::SetProperty(prop)
    }
}

/// Append-only sequence of commands for one drawing surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandLog(Vec<Command>);

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: impl Into<Command>) {
        self.0.push(command.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Command] {
        &self.0
    }

    /// Number of `AsyncBegin` entries without a matching `AsyncEnd`.
    pub fn pending_async(&self) -> usize {
        let mut pending = 0usize;
        for cmd in &self.0 {
            match cmd {
                Command::AsyncBegin => pending += 1,
                Command::AsyncEnd => pending = pending.saturating_sub(1),
                _ => {}
            }
        }
        pending
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl From<Vec<Command>> for CommandLog {
    fn from(commands: Vec<Command>) -> Self {
        Self(commands)
    }
}

impl<'a> IntoIterator for &'a CommandLog {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
