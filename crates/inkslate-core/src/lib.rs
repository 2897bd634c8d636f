//! Inkslate Core Library
//!
//! Platform-agnostic recording of freehand multi-pointer drawing: stroke
//! capture, a replayable command log, snapshot undo/redo and serialization.
//! Rendering engines live in `inkslate-render`.

pub mod animate;
pub mod bitmap;
pub mod capture;
pub mod color;
pub mod command;
pub mod document;
pub mod input;
pub mod memento;
pub mod options;
pub mod point;
pub mod serializer;
pub mod session;
pub mod shortcuts;
pub mod sketch;
pub mod style;
pub mod surface;

pub use animate::StrokeAnimation;
pub use bitmap::{Bitmap, BitmapError, BitmapResult, BoxFuture, DataUrlDecoder, ImageDecoder, ImageFormat};
pub use capture::{CaptureOutcome, GestureId, PointerState, StrokeCapture};
pub use color::{ColorError, StyleColor};
pub use command::{Command, CommandLog, Primitive, RawCommand};
pub use document::Document;
pub use input::{KeyEvent, Modifiers, MouseButton, PointerEvent, PointerEventKind};
pub use memento::{Memento, SaveKind, Snapshot};
pub use options::{GraphicsOptions, Options, PenUpStyle};
pub use point::{Point, PointerId, Stroke, Strokes};
pub use serializer::{SerializeError, SessionData};
pub use session::{Session, SessionError, SessionEvent, SessionResult};
pub use shortcuts::{HistoryAction, HistoryKeymap, Shortcut};
pub use sketch::{Sketch, SketchError};
pub use style::{GraphicsState, LineCap, LineJoin, StyleProperty};
pub use surface::{RasterSurface, RecordingSurface, SurfaceCall};
