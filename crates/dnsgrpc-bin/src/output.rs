//! Rendering of DNS messages for the terminal.

use std::fmt::Write;

use hickory_proto::op::{Message, MessageType, ResponseCode};

/// Render a reply the way `dnsgrpc` prints it.
///
/// - verbose: the whole message, dig style
/// - error rcode: `<qname> <qtype> <RCODE>`
/// - otherwise: one line per answer and additional record
pub fn render(message: &Message, verbose: bool) -> String {
    if verbose {
        return format!("{}\n\n", render_full(message));
    }

    if message.response_code() != ResponseCode::NoError {
        let (qname, qtype) = message
            .queries()
            .first()
            .map(|q| (q.name().to_string(), q.query_type().to_string()))
            .unwrap_or_else(|| ("<no question>".to_string(), "-".to_string()));
        return format!(
            "{qname} {qtype} {}\n\n\n",
            rcode_mnemonic(message.response_code())
        );
    }

    let mut out = String::new();
    for record in message.answers().iter().chain(message.additionals()) {
        let _ = writeln!(out, "{record}");
    }
    out.push_str("\n\n");
    out
}

/// Full dig-style rendering of every section.
pub fn render_full(message: &Message) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        ";; opcode: {}, status: {}, id: {}",
        format!("{:?}", message.op_code()).to_uppercase(),
        rcode_mnemonic(message.response_code()),
        message.id()
    );

    let mut flags = Vec::new();
    if message.message_type() == MessageType::Response {
        flags.push("qr");
    }
    if message.authoritative() {
        flags.push("aa");
    }
    if message.truncated() {
        flags.push("tc");
    }
    if message.recursion_desired() {
        flags.push("rd");
    }
    if message.recursion_available() {
        flags.push("ra");
    }
    if message.authentic_data() {
        flags.push("ad");
    }
    if message.checking_disabled() {
        flags.push("cd");
    }
    let _ = writeln!(
        out,
        ";; flags: {}; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
        flags.join(" "),
        message.queries().len(),
        message.answers().len(),
        message.name_servers().len(),
        message.additionals().len()
    );

    out.push_str("\n;; QUESTION SECTION:\n");
    for query in message.queries() {
        let _ = writeln!(
            out,
            ";{}\t{}\t{}",
            query.name(),
            query.query_class(),
            query.query_type()
        );
    }

    let sections = [
        ("ANSWER", message.answers()),
        ("AUTHORITY", message.name_servers()),
        ("ADDITIONAL", message.additionals()),
    ];
    for (title, records) in sections {
        if records.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n;; {title} SECTION:");
        for record in records {
            let _ = writeln!(out, "{record}");
        }
    }
    out
}

/// Conventional upper-case mnemonic for a response code.
pub fn rcode_mnemonic(code: ResponseCode) -> String {
    let name = match code {
        ResponseCode::NoError => "NOERROR",
        ResponseCode::FormErr => "FORMERR",
        ResponseCode::ServFail => "SERVFAIL",
        ResponseCode::NXDomain => "NXDOMAIN",
        ResponseCode::NotImp => "NOTIMP",
        ResponseCode::Refused => "REFUSED",
        ResponseCode::YXDomain => "YXDOMAIN",
        ResponseCode::YXRRSet => "YXRRSET",
        ResponseCode::NXRRSet => "NXRRSET",
        ResponseCode::NotAuth => "NOTAUTH",
        ResponseCode::NotZone => "NOTZONE",
        other => return format!("RCODE{}", u16::from(other)),
    };
    name.to_string()
}
