//! Decoder for Nagios external data files
//!
//! Nagios stores its current state (`status.dat`) and the data it keeps
//! across restarts (`retention.dat`) in a simple block format:
//!
//! ```text
//! # comment
//! servicestatus {
//!     host_name=web-1
//!     service_description=HTTP
//!     current_state=0
//! }
//! ```
//!
//! Documents are described by a [`Schema`], which maps block names to record
//! destinations. Records are plain structs declared with [`xdata_record!`],
//! which generates the static field table the decoder assigns through.
//!
//! [`Status`] covers the complete `status.dat` layout; callers only
//! interested in some blocks can declare a smaller document of their own.

mod decode;
mod schema;
mod status;
mod values;

pub use decode::{DecodeError, Decoder, DecoderOptions};
pub use schema::{
    Block, CoerceError, Document, Field, FieldKind, FieldValue, Record, Schema, SchemaBuilder,
    Setter, Shape, normalize_key,
};
pub use status::{
    ContactStatus, HostComment, HostStatus, Info, ProgramStatus, ServiceComment, ServiceStatus,
    Status,
};
pub use values::{
    AcknowledgementType, CheckType, HostState, ModifiedAttributes, ServiceState, StateType,
    UnknownValue,
};

/// Declare a struct decodable from an xdata block
///
/// Every field becomes an entry of the record's field table, keyed by the
/// field identifier. Field types must implement [`FieldValue`].
///
/// ```
/// use nagapi::xdata_record;
///
/// xdata_record! {
///     #[derive(Debug, Default)]
///     pub struct Downtime {
///         pub host_name: String,
///         pub downtime_id: i64,
///         pub fixed: bool,
///     }
/// }
/// ```
#[macro_export]
macro_rules! xdata_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::xdata::Record for $name {
            fn fields() -> &'static [$crate::xdata::Field<Self>] {
                static FIELDS: &[$crate::xdata::Field<$name>] = &[
                    $(
                        $crate::xdata::Field::new(
                            stringify!($field),
                            <$ty as $crate::xdata::FieldValue>::KIND,
                            |record: &mut $name, raw: &str| {
                                record.$field = <$ty as $crate::xdata::FieldValue>::parse_field(raw)?;
                                Ok(())
                            },
                        ),
                    )*
                ];
                FIELDS
            }
        }
    };
}
