#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use weft_codec as codec;
pub use weft_json as json;
pub use weft_utils as utils;

pub use weft_codec::{BackRef, Bytes, CodecError, ErrorKind, Mapper, MapperConfig};
pub use weft_codec::{auto_register, impl_typed};
pub use weft_json::JsonMapper;
