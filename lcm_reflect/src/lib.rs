/* LCM reflective codec
 *
 * Executes codec plans directly against dynamic values, so any struct of a
 * schema can be encoded, decoded and copied without generating source first.
 * Its output is byte-for-byte what generated code produces.
 */

pub mod codec;
pub mod errors;
pub mod interpreter;
pub mod value;
pub mod wire;

pub use codec::Codec;
pub use errors::{DecodeError, DecodeResult, EncodeError, EncodeResult, ShapeError};
pub use interpreter::Interpreter;
pub use value::{StructValue, Value};
