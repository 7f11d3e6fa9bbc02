//! Human-readable record of a round trip.

use std::fmt;

/// What a `get` step has produced so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadBack {
    /// The command was attempted but produced nothing (yet).
    Pending,
    /// The key did not exist.
    Missing,
    Value(String),
}

/// One attempted step of a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceStep {
    Connect { endpoint: String },
    Set { key: String, value: String },
    Get { key: String, read: ReadBack },
    Disconnect,
}

impl fmt::Display for TraceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { endpoint } => write!(f, "connect {endpoint}"),
            Self::Set { key, value } => write!(f, "set {key:?} {value:?}"),
            Self::Get { key, read } => match read {
                ReadBack::Pending => write!(f, "get {key:?}"),
                ReadBack::Missing => write!(f, "get {key:?} returned nil"),
                ReadBack::Value(value) => write!(f, "get {key:?} returned {value:?}"),
            },
            Self::Disconnect => f.write_str("disconnect"),
        }
    }
}

/// Ordered list of the steps a round trip attempted.
///
/// A step is pushed before it runs, so on failure the last entry is the one
/// that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    steps: Vec<TraceStep>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: TraceStep) {
        self.steps.push(step);
    }

    /// Fills in the result of the most recent `get`.
    pub(crate) fn record_read(&mut self, value: Option<String>) {
        if let Some(TraceStep::Get { read, .. }) = self
            .steps
            .iter_mut()
            .rev()
            .find(|step| matches!(step, TraceStep::Get { .. }))
        {
            *read = match value {
                Some(value) => ReadBack::Value(value),
                None => ReadBack::Missing,
            };
        }
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The value the round trip read back, if the `get` step got that far.
    pub fn read_back(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|step| match step {
            TraceStep::Get {
                read: ReadBack::Value(value),
                ..
            } => Some(value.as_str()),
            _ => None,
        })
    }

    /// Rendered lines, one per step.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.steps.iter().map(ToString::to_string)
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_trace() -> Trace {
        let mut trace = Trace::new();
        trace.push(TraceStep::Connect {
            endpoint: "redis://127.0.0.1:6379/".into(),
        });
        trace.push(TraceStep::Set {
            key: "my-key".into(),
            value: "this is my-key's stored value".into(),
        });
        trace.push(TraceStep::Get {
            key: "my-key".into(),
            read: ReadBack::Pending,
        });
        trace.record_read(Some("this is my-key's stored value".into()));
        trace.push(TraceStep::Disconnect);
        trace
    }

    #[test]
    fn renders_one_line_per_step() {
        let rendered = full_trace().to_string();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "connect redis://127.0.0.1:6379/",
                "set \"my-key\" \"this is my-key's stored value\"",
                "get \"my-key\" returned \"this is my-key's stored value\"",
                "disconnect",
            ]
        );
    }

    #[test]
    fn read_back_reflects_recorded_value() {
        let trace = full_trace();
        assert_eq!(trace.read_back(), Some("this is my-key's stored value"));
        assert_eq!(trace.len(), 4);
    }

    #[test]
    fn missing_key_renders_nil() {
        let mut trace = Trace::new();
        trace.push(TraceStep::Get {
            key: "gone".into(),
            read: ReadBack::Pending,
        });
        assert_eq!(trace.lines().next().as_deref(), Some("get \"gone\""));
        trace.record_read(None);
        assert_eq!(trace.to_string(), "get \"gone\" returned nil");
        assert_eq!(trace.read_back(), None);
    }

    #[test]
    fn quotes_in_keys_are_escaped() {
        let step = TraceStep::Set {
            key: "a\"b".into(),
            value: "v".into(),
        };
        assert_eq!(step.to_string(), r#"set "a\"b" "v""#);
    }
}
