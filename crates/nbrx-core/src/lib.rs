//! DSP primitives for the narrowband multi-channel receiver.
//!
//! Every type here is a streaming building block: it owns whatever history
//! it needs to filter, mix, decimate, discriminate, or squelch a signal
//! correctly across arbitrarily split input batches. A channel worker wires
//! these together in sequence; this crate has no opinion on threading,
//! I/O, or process lifetime.

pub mod config;
pub mod decimator;
pub mod discriminator;
pub mod fir;
pub mod math;
pub mod mixer;
pub mod squelch;

pub use config::{Config, ConfigError, Mode, VoterKind};
pub use decimator::Decimator;
pub use discriminator::{AmDiscriminator, FmDiscriminator};
pub use fir::{design_highpass, design_highpass_with, design_lowpass, design_lowpass_with, FirFilter};
pub use mixer::CarrierMixer;
pub use squelch::{SquelchEngine, SquelchEvent, Voter};
