//! Permessage-deflate WebSocket compression extension (RFC 7692).
//!
//! Negotiation works on [`PermessageDeflateOptions`], one per offered (or
//! accepted) parameter set. Once a handshake settles on a set, each side
//! builds a [`Deflater`] for the messages it sends and an [`Inflater`] for
//! the messages it receives.

use crate::connection::Role;
use crate::error::{Error, Result};
use crate::extensions::ExtensionOffer;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

/// Registered extension token.
pub const PERMESSAGE_DEFLATE: &str = "permessage-deflate";

const MIN_WINDOW_BITS: u8 = 8;
const MAX_WINDOW_BITS: u8 = 15;
const DEFAULT_WINDOW_BITS: u8 = 15;
const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Sync-flush marker removed from the end of every compressed message.
pub const DEFLATE_TRAILER: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

const SERVER_NO_CONTEXT_TAKEOVER: &str = "server_no_context_takeover";
const CLIENT_NO_CONTEXT_TAKEOVER: &str = "client_no_context_takeover";
const SERVER_MAX_WINDOW_BITS: &str = "server_max_window_bits";
const CLIENT_MAX_WINDOW_BITS: &str = "client_max_window_bits";

/// Local permessage-deflate preferences.
///
/// A server folds these into whatever the client offered; a client turns
/// them into its offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeflateConfig {
    pub server_no_context_takeover: bool,
    pub client_no_context_takeover: bool,
    pub server_max_window_bits: u8,
    pub client_max_window_bits: u8,
    pub compression_level: u32,
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            server_no_context_takeover: false,
            client_no_context_takeover: false,
            server_max_window_bits: DEFAULT_WINDOW_BITS,
            client_max_window_bits: DEFAULT_WINDOW_BITS,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl DeflateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server_no_context_takeover(mut self, value: bool) -> Self {
        self.server_no_context_takeover = value;
        self
    }

    pub fn client_no_context_takeover(mut self, value: bool) -> Self {
        self.client_no_context_takeover = value;
        self
    }

    pub fn server_max_window_bits(mut self, bits: u8) -> Result<Self> {
        self.server_max_window_bits = check_window_bits(SERVER_MAX_WINDOW_BITS, bits)?;
        Ok(self)
    }

    pub fn client_max_window_bits(mut self, bits: u8) -> Result<Self> {
        self.client_max_window_bits = check_window_bits(CLIENT_MAX_WINDOW_BITS, bits)?;
        Ok(self)
    }

    pub fn compression_level(mut self, level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::InvalidConfig(format!(
                "compression_level must be 0-9, got {level}"
            )));
        }
        self.compression_level = level;
        Ok(self)
    }

    /// Server side: accept a client offer, tightening it with local preferences.
    ///
    /// No-context-takeover flags are OR-ed in and both windows may only
    /// shrink. The client window is only limited when the offer carried
    /// `client_max_window_bits`; otherwise the client cannot honour it and
    /// it stays at 15. A disabled offer stays disabled.
    #[must_use]
    pub fn accept(&self, offer: &PermessageDeflateOptions) -> PermessageDeflateOptions {
        if !offer.enabled {
            return *offer;
        }
        let client_max_window_bits = if offer.client_max_window_bits_present {
            offer.client_max_window_bits.min(self.client_max_window_bits)
        } else {
            DEFAULT_WINDOW_BITS
        };
        PermessageDeflateOptions {
            enabled: true,
            server_no_context_takeover: offer.server_no_context_takeover
                || self.server_no_context_takeover,
            client_no_context_takeover: offer.client_no_context_takeover
                || self.client_no_context_takeover,
            server_max_window_bits: offer
                .server_max_window_bits
                .min(self.server_max_window_bits),
            client_max_window_bits,
            // Matches what `to_header_value` renders for the response.
            client_max_window_bits_present: client_max_window_bits != DEFAULT_WINDOW_BITS,
        }
    }

    /// Client side: the parameter set to offer.
    #[must_use]
    pub fn offer(&self) -> PermessageDeflateOptions {
        PermessageDeflateOptions {
            enabled: true,
            server_no_context_takeover: self.server_no_context_takeover,
            client_no_context_takeover: self.client_no_context_takeover,
            server_max_window_bits: self.server_max_window_bits,
            client_max_window_bits: self.client_max_window_bits,
            client_max_window_bits_present: true,
        }
    }
}

/// One permessage-deflate parameter set from a `Sec-WebSocket-Extensions`
/// header, or the disabled sentinel.
///
/// Window bits default to 15 when the parameter is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermessageDeflateOptions {
    pub enabled: bool,
    pub server_no_context_takeover: bool,
    pub client_no_context_takeover: bool,
    pub server_max_window_bits: u8,
    pub client_max_window_bits: u8,
    /// Whether the header carried `client_max_window_bits`. In an offer this
    /// is what allows the server to pick a client window.
    pub client_max_window_bits_present: bool,
}

impl Default for PermessageDeflateOptions {
    fn default() -> Self {
        Self::disabled()
    }
}

impl PermessageDeflateOptions {
    /// Compression off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            server_no_context_takeover: false,
            client_no_context_takeover: false,
            server_max_window_bits: DEFAULT_WINDOW_BITS,
            client_max_window_bits: DEFAULT_WINDOW_BITS,
            client_max_window_bits_present: false,
        }
    }

    /// Compression on with every parameter at its default.
    #[must_use]
    pub const fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::disabled()
        }
    }

    /// Parse every permessage-deflate offer found in the given header values.
    ///
    /// Multiple header instances are treated as one comma-joined list. Other
    /// extensions are skipped. The result always ends with a disabled entry,
    /// so a negotiator can walk it in order and fall back to no compression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExtension`] for a malformed list element or an
    /// invalid permessage-deflate parameter.
    pub fn from_header_values<I, S>(values: I) -> Result<Vec<Self>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sets = Vec::new();
        for value in values {
            for offer in ExtensionOffer::parse_header(value.as_ref())? {
                if offer.is(PERMESSAGE_DEFLATE) {
                    sets.push(Self::from_offer(&offer)?);
                }
            }
        }
        sets.push(Self::disabled());
        Ok(sets)
    }

    /// Build an enabled parameter set from one parsed offer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExtension`] for an unknown or repeated
    /// parameter, a value on a flag parameter, or window bits outside 8-15.
    pub fn from_offer(offer: &ExtensionOffer) -> Result<Self> {
        let mut options = Self::enabled();
        let mut seen: Vec<&str> = Vec::with_capacity(offer.params.len());

        for param in &offer.params {
            let name = param.name.as_str();
            if seen.contains(&name) {
                return Err(Error::InvalidExtension(format!(
                    "{name} specified more than once"
                )));
            }
            seen.push(name);

            match name {
                SERVER_NO_CONTEXT_TAKEOVER | CLIENT_NO_CONTEXT_TAKEOVER => {
                    if param.value.is_some() {
                        return Err(Error::InvalidExtension(format!(
                            "{name} must not have a value"
                        )));
                    }
                    if name == SERVER_NO_CONTEXT_TAKEOVER {
                        options.server_no_context_takeover = true;
                    } else {
                        options.client_no_context_takeover = true;
                    }
                }
                SERVER_MAX_WINDOW_BITS => {
                    let value = param.value.as_deref().ok_or_else(|| {
                        Error::InvalidExtension(format!("{name} must have a value"))
                    })?;
                    options.server_max_window_bits = parse_window_bits(name, value)?;
                }
                CLIENT_MAX_WINDOW_BITS => {
                    options.client_max_window_bits = match param.value.as_deref() {
                        Some(value) => parse_window_bits(name, value)?,
                        None => DEFAULT_WINDOW_BITS,
                    };
                    options.client_max_window_bits_present = true;
                }
                other => {
                    return Err(Error::InvalidExtension(format!(
                        "unknown permessage-deflate parameter: {other}"
                    )));
                }
            }
        }

        Ok(options)
    }

    /// Render as a response header value, or `None` when disabled.
    ///
    /// Window bits equal to 15 are left out.
    #[must_use]
    pub fn to_header_value(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let mut header = String::from(PERMESSAGE_DEFLATE);
        if self.client_max_window_bits != DEFAULT_WINDOW_BITS {
            header.push_str(&format!(
                "; {CLIENT_MAX_WINDOW_BITS}={}",
                self.client_max_window_bits
            ));
        }
        if self.client_no_context_takeover {
            header.push_str("; ");
            header.push_str(CLIENT_NO_CONTEXT_TAKEOVER);
        }
        if self.server_max_window_bits != DEFAULT_WINDOW_BITS {
            header.push_str(&format!(
                "; {SERVER_MAX_WINDOW_BITS}={}",
                self.server_max_window_bits
            ));
        }
        if self.server_no_context_takeover {
            header.push_str("; ");
            header.push_str(SERVER_NO_CONTEXT_TAKEOVER);
        }
        Some(header)
    }

    /// Render as a client offer.
    ///
    /// Unlike [`to_header_value`](Self::to_header_value) this always carries a
    /// bare `client_max_window_bits` when the client accepts any window, which
    /// tells the server it may pick one.
    #[must_use]
    pub fn to_offer_value(&self) -> Option<String> {
        let mut header = self.to_header_value()?;
        if self.client_max_window_bits_present && self.client_max_window_bits == DEFAULT_WINDOW_BITS {
            header.push_str("; ");
            header.push_str(CLIENT_MAX_WINDOW_BITS);
        }
        Some(header)
    }

    /// Client side: check that a server's accepted parameter set is one this
    /// client could have asked for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExtension`] if the server enabled compression
    /// without an offer, granted itself a larger window than offered, or set
    /// a client window the offer did not allow.
    pub fn validate_response_to_request(&self, offered: &[Self]) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let acceptable = offered.iter().filter(|offer| offer.enabled).any(|offer| {
            self.server_max_window_bits <= offer.server_max_window_bits
                && self.client_max_window_bits <= offer.client_max_window_bits
                && (!self.client_max_window_bits_present || offer.client_max_window_bits_present)
        });
        if acceptable {
            Ok(())
        } else {
            Err(Error::InvalidExtension(format!(
                "server accepted {PERMESSAGE_DEFLATE} parameters that were not offered"
            )))
        }
    }

    /// Whether messages sent by `sender` are compressed without context takeover.
    #[must_use]
    pub const fn no_context_takeover(&self, sender: Role) -> bool {
        match sender {
            Role::Server => self.server_no_context_takeover,
            Role::Client => self.client_no_context_takeover,
        }
    }

    /// LZ77 window used by `sender` to compress.
    #[must_use]
    pub const fn max_window_bits(&self, sender: Role) -> u8 {
        match sender {
            Role::Server => self.server_max_window_bits,
            Role::Client => self.client_max_window_bits,
        }
    }
}

fn check_window_bits(name: &str, bits: u8) -> Result<u8> {
    if (MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&bits) {
        Ok(bits)
    } else {
        Err(Error::InvalidExtension(format!(
            "{name} must be {MIN_WINDOW_BITS}-{MAX_WINDOW_BITS}, got {bits}"
        )))
    }
}

fn parse_window_bits(name: &str, value: &str) -> Result<u8> {
    let bits: u8 = value
        .parse()
        .map_err(|_| Error::InvalidExtension(format!("invalid {name} value: {value}")))?;
    check_window_bits(name, bits)
}

fn compression_error(e: impl std::fmt::Display) -> Error {
    log::warn!("permessage-deflate failure: {e}");
    Error::Compression(e.to_string())
}

/// Grow `out` when it has no spare room for the next zlib call.
fn ensure_spare(out: &mut Vec<u8>) {
    if out.len() == out.capacity() {
        out.reserve(out.capacity().clamp(1024, 64 * 1024));
    }
}

/// Outbound half: compresses the messages this endpoint sends.
///
/// The zlib stream is created lazily and, without context takeover, dropped
/// at the end of every message.
pub struct Deflater {
    level: Compression,
    window_bits: u8,
    no_context_takeover: bool,
    compress: Option<Compress>,
    contexts_created: u64,
}

impl Deflater {
    /// Create a compressor for messages sent with the given parameters.
    ///
    /// zlib cannot produce raw deflate with an 8-bit window, so 8 is raised
    /// to 9; the result is still decodable by any peer.
    pub fn new(level: u32, window_bits: u8, no_context_takeover: bool) -> Self {
        Self {
            level: Compression::new(level.min(9)),
            window_bits: window_bits.clamp(9, MAX_WINDOW_BITS),
            no_context_takeover,
            compress: None,
            contexts_created: 0,
        }
    }

    /// Compressor for the messages `role` sends under `options`.
    pub fn for_role(options: &PermessageDeflateOptions, role: Role, level: u32) -> Self {
        Self::new(
            level,
            options.max_window_bits(role),
            options.no_context_takeover(role),
        )
    }

    /// Compress one piece of a message.
    ///
    /// Every call ends on a sync flush. When `fin` is set the message is
    /// complete: the trailing `00 00 ff ff` is removed and, without context
    /// takeover, the stream is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compression`] if zlib reports a failure.
    pub fn compress(&mut self, payload: &[u8], fin: bool) -> Result<Vec<u8>> {
        let (level, bits) = (self.level, self.window_bits);
        if self.compress.is_none() {
            self.contexts_created += 1;
        }
        let compress = self
            .compress
            .get_or_insert_with(|| Compress::new_with_window_bits(level, false, bits));

        let mut out = Vec::with_capacity(payload.len() / 2 + 64);
        let mut consumed = 0;
        loop {
            ensure_spare(&mut out);
            let before = compress.total_in();
            compress
                .compress_vec(&payload[consumed..], &mut out, FlushCompress::Sync)
                .map_err(compression_error)?;
            consumed += (compress.total_in() - before) as usize;
            // Spare output room after a sync flush means zlib is done.
            if consumed == payload.len() && out.len() < out.capacity() {
                break;
            }
        }

        if fin {
            if out.ends_with(&DEFLATE_TRAILER) {
                out.truncate(out.len() - DEFLATE_TRAILER.len());
            }
            if self.no_context_takeover {
                self.compress = None;
            }
        }
        Ok(out)
    }

    /// Number of zlib streams created so far.
    pub fn contexts_created(&self) -> u64 {
        self.contexts_created
    }
}

impl std::fmt::Debug for Deflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deflater")
            .field("window_bits", &self.window_bits)
            .field("no_context_takeover", &self.no_context_takeover)
            .field("contexts_created", &self.contexts_created)
            .finish()
    }
}

/// Inbound half: decompresses the messages the peer sends.
pub struct Inflater {
    no_context_takeover: bool,
    decompress: Option<Decompress>,
    contexts_created: u64,
}

impl Inflater {
    pub fn new(no_context_takeover: bool) -> Self {
        Self {
            no_context_takeover,
            decompress: None,
            contexts_created: 0,
        }
    }

    /// Decompressor for the messages the peer of `role` sends under `options`.
    pub fn for_role(options: &PermessageDeflateOptions, role: Role) -> Self {
        Self::new(options.no_context_takeover(role.peer()))
    }

    /// Decompress one complete message payload.
    ///
    /// The sync-flush trailer is appended before inflating. A `max_size` of 0
    /// means unlimited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] once the output exceeds `max_size`,
    /// or [`Error::Compression`] for corrupt input.
    pub fn decompress(&mut self, payload: &[u8], max_size: usize) -> Result<Vec<u8>> {
        if self.decompress.is_none() {
            self.contexts_created += 1;
        }
        // The window is always 15: it decodes anything a smaller window produced.
        let decompress = self.decompress.get_or_insert_with(|| Decompress::new(false));

        let mut out = Vec::with_capacity(payload.len().saturating_mul(2).max(64));
        let mut finished = false;

        'segments: for segment in [payload, &DEFLATE_TRAILER[..]] {
            let mut consumed = 0;
            loop {
                ensure_spare(&mut out);
                let (before_in, before_out) = (decompress.total_in(), decompress.total_out());
                let status = decompress
                    .decompress_vec(&segment[consumed..], &mut out, FlushDecompress::Sync)
                    .map_err(compression_error)?;
                consumed += (decompress.total_in() - before_in) as usize;

                if max_size != 0 && out.len() > max_size {
                    self.decompress = None;
                    return Err(Error::MessageTooLarge {
                        size: out.len(),
                        max: max_size,
                    });
                }
                if status == Status::StreamEnd {
                    finished = true;
                    break 'segments;
                }
                let stalled = decompress.total_in() == before_in
                    && decompress.total_out() == before_out;
                if (consumed == segment.len() && out.len() < out.capacity()) || stalled {
                    break;
                }
            }
        }

        // A final deflate block ends the stream; the next message needs a fresh one.
        if finished || self.no_context_takeover {
            self.decompress = None;
        }
        Ok(out)
    }

    /// Number of zlib streams created so far.
    pub fn contexts_created(&self) -> u64 {
        self.contexts_created
    }
}

impl std::fmt::Debug for Inflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inflater")
            .field("no_context_takeover", &self.no_context_takeover)
            .field("contexts_created", &self.contexts_created)
            .finish()
    }
}
