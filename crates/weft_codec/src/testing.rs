//! Helpers shared by the unit tests.

use crate::error::CodecError;
use crate::info::Typed;
use crate::mapper::{Mapper, MapperConfig};
use crate::registry::RegistryBuilder;
use crate::stream::{StreamEncoder, TokenBuffer};

pub(crate) fn mapper(register: impl FnOnce(&mut RegistryBuilder)) -> Mapper {
    let mut builder = RegistryBuilder::new();
    register(&mut builder);
    Mapper::new(builder.build().unwrap())
}

pub(crate) fn mapper_with(
    register: impl FnOnce(&mut RegistryBuilder),
    config: MapperConfig,
) -> Mapper {
    mapper(register).with_config(config)
}

/// Encodes `value` and renders the tokens as compact JSON.
pub(crate) fn encode<T: Typed>(mapper: &Mapper, value: &T) -> Result<String, CodecError> {
    mapper
        .encode(TokenBuffer::new(), value)
        .map(|tokens| tokens.to_string())
}

pub(crate) fn roundtrip<T: Typed>(mapper: &Mapper, value: &T) -> T {
    let tokens = mapper.encode(TokenBuffer::new(), value).unwrap();
    mapper.decode(tokens.decoder()).unwrap()
}

/// Records the tokens written by `write`.
pub(crate) fn tokens(
    write: impl FnOnce(&mut StreamEncoder<TokenBuffer>) -> Result<(), CodecError>,
) -> TokenBuffer {
    let mut encoder = StreamEncoder::new(TokenBuffer::new());
    write(&mut encoder).unwrap();
    encoder.finish().unwrap();
    encoder.into_inner()
}
