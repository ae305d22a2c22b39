//! DNS query construction.

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};

use crate::error::Result;

/// Returns `name` fully qualified, appending the root label if missing.
#[must_use]
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Build a single-question recursive query for `name` and `record_type`.
///
/// The message gets a random id, opcode QUERY and the RD bit set.
pub fn build_query(name: &str, record_type: RecordType) -> Result<Message> {
    let name = Name::from_ascii(fqdn(name))?;

    let mut message = Message::new();
    message
        .set_id(rand::random::<u16>())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(name, record_type));
    Ok(message)
}
