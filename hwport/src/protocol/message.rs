//! Requests and replies exchanged with the host.
//!
//! Inbound terms are decoded into closed enums. Anything that doesn't match
//! a known shape (unknown tag, wrong arity, wrong field type) is a protocol
//! violation; the host and driver disagree about the protocol and the
//! driver gives up rather than guess.
//!
//! ## GPIO
//!
//! | Request | Reply |
//! |---|---|
//! | `{init, Pin, Direction}` | `ok` or `{error, gpio_init_fail}` |
//! | `{cast, release}` | none |
//! | `{call, Token, {write, Value}}` | `{port_reply, Token, ok \| {error, gpio_write_failed}}` |
//! | `{call, Token, {read}}` | `{port_reply, Token, 0 \| 1 \| {error, gpio_read_failed}}` |
//! | `{call, Token, {set_int, Mode}}` | `{port_reply, Token, ok \| {error, gpio_set_int_failed}}` |
//!
//! Interrupts are sent unsolicited as `{gpio_interrupt, rising | falling}`.
//!
//! ## I2C
//!
//! | Request | Reply |
//! |---|---|
//! | `{i2c_write, Data}` | `1` or `-1` |
//! | `{i2c_read, Length}` | `Data` or `-1` |

use super::term::Term;
use crate::error::{Error, Result};
use crate::hw_trait::Edge;

/// A request for the GPIO port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpioRequest {
    /// Open a pin. Both fields are checked by the controller, so bad values
    /// fail the request instead of the process.
    Init { pin: i64, direction: String },
    /// Release the pin; no reply.
    Release,
    /// A synchronous call; the token comes back with the result.
    Call { token: Term, op: GpioCall },
}

/// Operations carried by a GPIO `call`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpioCall {
    /// Nonzero means high
    Write(i64),
    Read,
    SetInterrupt(String),
}

/// A request for the I2C port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I2cRequest {
    Write(Vec<u8>),
    Read(usize),
}

/// Split a request tuple into its tag and remaining elements.
fn tagged(term: Term, what: &str) -> Result<(String, Vec<Term>)> {
    let mut elements = term
        .into_tuple()
        .ok_or_else(|| Error::protocol(format!("{what}: expected a tuple")))?;
    if elements.is_empty() {
        return Err(Error::protocol(format!("{what}: empty tuple")));
    }
    let tag = match elements.remove(0) {
        Term::Atom(tag) => tag,
        other => return Err(Error::protocol(format!("{what}: bad tag {other}"))),
    };
    Ok((tag, elements))
}

fn integer(term: &Term, what: &str) -> Result<i64> {
    term.as_integer()
        .ok_or_else(|| Error::protocol(format!("{what}: expected an integer, got {term}")))
}

fn atom(term: &Term, what: &str) -> Result<String> {
    term.as_atom()
        .map(str::to_owned)
        .ok_or_else(|| Error::protocol(format!("{what}: expected an atom, got {term}")))
}

impl TryFrom<Term> for GpioRequest {
    type Error = Error;

    fn try_from(term: Term) -> Result<Self> {
        let (tag, mut args) = tagged(term, "request")?;
        match (tag.as_str(), args.len()) {
            ("init", 2) => Ok(GpioRequest::Init {
                pin: integer(&args[0], "init")?,
                direction: atom(&args[1], "init")?,
            }),
            ("cast", 1) => match atom(&args[0], "cast")?.as_str() {
                "release" => Ok(GpioRequest::Release),
                other => Err(Error::protocol(format!("cast: bad command {other}"))),
            },
            ("call", 2) => {
                let op = args.pop().map(GpioCall::try_from).transpose()?;
                let token = args.pop();
                match (token, op) {
                    (Some(token), Some(op)) => Ok(GpioRequest::Call { token, op }),
                    _ => Err(Error::protocol("call: missing token or operation")),
                }
            }
            (tag, arity) => Err(Error::protocol(format!(
                "unexpected element {tag}/{}",
                arity + 1
            ))),
        }
    }
}

impl TryFrom<Term> for GpioCall {
    type Error = Error;

    fn try_from(term: Term) -> Result<Self> {
        let (tag, args) = tagged(term, "call")?;
        match (tag.as_str(), args.as_slice()) {
            ("write", [value]) => Ok(GpioCall::Write(integer(value, "write")?)),
            ("read", []) => Ok(GpioCall::Read),
            ("set_int", [mode]) => Ok(GpioCall::SetInterrupt(atom(mode, "set_int")?)),
            (tag, args) => Err(Error::protocol(format!(
                "call: unexpected operation {tag}/{}",
                args.len() + 1
            ))),
        }
    }
}

impl TryFrom<Term> for I2cRequest {
    type Error = Error;

    fn try_from(term: Term) -> Result<Self> {
        let (tag, mut args) = tagged(term, "request")?;
        match (tag.as_str(), args.len()) {
            ("i2c_write", 1) => args
                .pop()
                .and_then(Term::into_binary)
                .map(I2cRequest::Write)
                .ok_or_else(|| Error::protocol("i2c_write: expected a binary")),
            ("i2c_read", 1) => {
                let len = integer(&args[0], "i2c_read")?;
                usize::try_from(len)
                    .map(I2cRequest::Read)
                    .map_err(|_| Error::protocol(format!("i2c_read: bad length {len}")))
            }
            (tag, _) => Err(Error::protocol(format!("unexpected request {tag}"))),
        }
    }
}

pub fn ok() -> Term {
    Term::atom("ok")
}

/// `{error, Reason}`
pub fn error(reason: &str) -> Term {
    Term::tuple([Term::atom("error"), Term::atom(reason)])
}

/// Wrap the result of a `call` with the host's token.
pub fn port_reply(token: Term, result: Term) -> Term {
    Term::tuple([Term::atom("port_reply"), token, result])
}

/// Unsolicited interrupt notification.
pub fn gpio_interrupt(edge: Edge) -> Term {
    Term::tuple([Term::atom("gpio_interrupt"), Term::atom(edge.as_str())])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> Term {
        Term::Reference {
            node: "nonode@nohost".into(),
            creation: 0,
            ids: vec![1, 2, 3],
        }
    }

    fn call(op: Term) -> Term {
        Term::tuple([Term::atom("call"), token(), op])
    }

    #[test]
    fn decode_gpio_requests() {
        let init = Term::tuple([Term::atom("init"), Term::Integer(4), Term::atom("output")]);
        assert_eq!(
            GpioRequest::try_from(init).unwrap(),
            GpioRequest::Init {
                pin: 4,
                direction: "output".into()
            }
        );

        let release = Term::tuple([Term::atom("cast"), Term::atom("release")]);
        assert_eq!(GpioRequest::try_from(release).unwrap(), GpioRequest::Release);

        let write = call(Term::tuple([Term::atom("write"), Term::Integer(1)]));
        assert_eq!(
            GpioRequest::try_from(write).unwrap(),
            GpioRequest::Call {
                token: token(),
                op: GpioCall::Write(1)
            }
        );

        let read = call(Term::tuple([Term::atom("read")]));
        assert_eq!(
            GpioRequest::try_from(read).unwrap(),
            GpioRequest::Call {
                token: token(),
                op: GpioCall::Read
            }
        );

        let set_int = call(Term::tuple([Term::atom("set_int"), Term::atom("both")]));
        assert_eq!(
            GpioRequest::try_from(set_int).unwrap(),
            GpioRequest::Call {
                token: token(),
                op: GpioCall::SetInterrupt("both".into())
            }
        );
    }

    #[test]
    fn direction_is_not_validated_by_the_decoder() {
        // An unknown direction is a soft init failure, not a protocol error
        let init = Term::tuple([Term::atom("init"), Term::Integer(4), Term::atom("sideways")]);
        assert!(GpioRequest::try_from(init).is_ok());
    }

    #[test]
    fn reject_malformed_gpio_requests() {
        let cases = [
            Term::atom("init"),
            Term::tuple([]),
            Term::tuple([Term::Integer(1), Term::Integer(2)]),
            Term::tuple([Term::atom("init"), Term::Integer(4)]),
            Term::tuple([Term::atom("init"), Term::atom("four"), Term::atom("output")]),
            Term::tuple([Term::atom("cast"), Term::atom("explode")]),
            Term::tuple([Term::atom("call"), token()]),
            call(Term::atom("read")),
            call(Term::tuple([Term::atom("write")])),
            call(Term::tuple([Term::atom("write"), Term::Binary(vec![1])])),
            call(Term::tuple([Term::atom("frobnicate")])),
            Term::tuple([Term::atom("bogus"), Term::Integer(1)]),
        ];

        for term in cases {
            let shown = term.to_string();
            match GpioRequest::try_from(term) {
                Err(e) => assert!(e.is_fatal(), "{shown}: {e}"),
                Ok(request) => panic!("{shown} decoded as {request:?}"),
            }
        }
    }

    #[test]
    fn decode_i2c_requests() {
        let write = Term::tuple([Term::atom("i2c_write"), Term::Binary(vec![1, 2, 3])]);
        assert_eq!(
            I2cRequest::try_from(write).unwrap(),
            I2cRequest::Write(vec![1, 2, 3])
        );

        let read = Term::tuple([Term::atom("i2c_read"), Term::Integer(16)]);
        assert_eq!(I2cRequest::try_from(read).unwrap(), I2cRequest::Read(16));
    }

    #[test]
    fn reject_malformed_i2c_requests() {
        let cases = [
            Term::tuple([Term::atom("i2c_write"), Term::Integer(3)]),
            Term::tuple([Term::atom("i2c_read"), Term::Integer(-1)]),
            Term::tuple([Term::atom("i2c_read")]),
            Term::tuple([Term::atom("i2c_scan")]),
        ];

        for term in cases {
            assert!(I2cRequest::try_from(term).unwrap_err().is_fatal());
        }
    }

    #[test]
    fn reply_shapes() {
        assert_eq!(error("gpio_init_fail").to_string(), "{error,gpio_init_fail}");
        assert_eq!(
            port_reply(Term::Integer(9), ok()).to_string(),
            "{port_reply,9,ok}"
        );
        assert_eq!(
            gpio_interrupt(Edge::Falling).to_string(),
            "{gpio_interrupt,falling}"
        );
    }
}
