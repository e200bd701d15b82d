use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use std::fmt;

pub type ByteStream = BoxStream<'static, Result<Bytes>>;
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

#[async_trait]
pub trait FileHandle: Send + Sync {
    async fn url(&self) -> Result<String>;
}

pub enum ProviderOutput {
    Null,
    Text(String),
    Bytes(Bytes),
    ByteStream(ByteStream),
    File(Box<dyn FileHandle>),
    Object(Map<String, Value>),
    List(Vec<ProviderOutput>),
    Scalar(Value),
}

impl ProviderOutput {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => ProviderOutput::Null,
            Value::String(s) => ProviderOutput::Text(s),
            Value::Array(items) => {
                ProviderOutput::List(items.into_iter().map(ProviderOutput::from_json).collect())
            }
            Value::Object(map) => ProviderOutput::Object(map),
            other => ProviderOutput::Scalar(other),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ProviderOutput::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderOutput::Null => "null",
            ProviderOutput::Text(_) => "text",
            ProviderOutput::Bytes(_) => "bytes",
            ProviderOutput::ByteStream(_) => "byte-stream",
            ProviderOutput::File(_) => "file",
            ProviderOutput::Object(_) => "object",
            ProviderOutput::List(_) => "list",
            ProviderOutput::Scalar(_) => "scalar",
        }
    }
}

impl fmt::Debug for ProviderOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderOutput::Text(s) if s.chars().count() > 96 => {
                let head: String = s.chars().take(96).collect();
                write!(f, "Text({:?}… {} chars)", head, s.len())
            }
            ProviderOutput::Text(s) => write!(f, "Text({:?})", s),
            ProviderOutput::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            ProviderOutput::Object(map) => {
                let keys: Vec<&String> = map.keys().collect();
                write!(f, "Object(keys: {:?})", keys)
            }
            ProviderOutput::List(items) => f.debug_list().entries(items.iter()).finish(),
            ProviderOutput::Scalar(v) => write!(f, "Scalar({})", v),
            other => f.write_str(other.kind()),
        }
    }
}

#[derive(Debug)]
pub enum StreamEvent {
    Chunk(Bytes),
    Value(ProviderOutput),
}

pub enum RunOutput {
    Direct(ProviderOutput),
    Stream(EventStream),
}

impl fmt::Debug for RunOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutput::Direct(output) => f.debug_tuple("Direct").field(output).finish(),
            RunOutput::Stream(_) => f.write_str("Stream"),
        }
    }
}
