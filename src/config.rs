//! Knobs for the encoder and decoder.

use crate::decode::Decoder;
use crate::encode::Encoder;

/// What the decoder does when a singular field shows up more than once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Protobuf semantics: the last scalar wins, embedded messages are merged.
    #[default]
    LastWins,
    /// Fail with [`Error::DuplicateField`](crate::error::Error::DuplicateField).
    Reject,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Pack every repeated numeric field into a single length-delimited
    /// record, not just the ones whose descriptor asks for it.
    pub packed_repeated: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub duplicates: DuplicatePolicy,
    /// Keep the raw records of unknown fields on the decoded message so they
    /// are written back out on re-encode.
    pub preserve_unknown: bool,
    /// Start every decoded message from [`Message::zeroed`](crate::value::Message::zeroed)
    /// instead of an empty one.
    pub zero_init: bool,
}

/// Configuration for encoding and decoding.
///
/// The defaults match plain protobuf behavior: unpacked repeated fields,
/// last value wins, unknown fields dropped, absent fields stay absent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Config {
    pub(crate) encode: EncodeOptions,
    pub(crate) decode: DecodeOptions,
}

impl Config {
    /// Create a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pack all repeated numeric fields on encode.
    pub fn packed_repeated(&mut self, packed: bool) -> &mut Self {
        self.encode.packed_repeated = packed;
        self
    }

    /// How repeated occurrences of singular fields are handled on decode.
    pub fn duplicates(&mut self, policy: DuplicatePolicy) -> &mut Self {
        self.decode.duplicates = policy;
        self
    }

    /// Preserve unknown fields on decode.
    pub fn preserve_unknown(&mut self, preserve: bool) -> &mut Self {
        self.decode.preserve_unknown = preserve;
        self
    }

    /// Decode into zero-initialized messages.
    pub fn zero_init(&mut self, zero_init: bool) -> &mut Self {
        self.decode.zero_init = zero_init;
        self
    }

    /// Options handed to [`Config::encoder`].
    pub fn encode_options(&self) -> EncodeOptions {
        self.encode
    }

    /// Options handed to [`Config::decoder`].
    pub fn decode_options(&self) -> DecodeOptions {
        self.decode
    }

    /// An [`Encoder`] using this configuration.
    pub fn encoder(&self) -> Encoder {
        Encoder::new(self.encode)
    }

    /// A [`Decoder`] using this configuration.
    pub fn decoder(&self) -> Decoder {
        Decoder::new(self.decode)
    }
}
