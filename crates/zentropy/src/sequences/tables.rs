//! Predefined sequence tables.
//!
//! Built once on first use and shared for the life of the process.

use std::sync::OnceLock;

use zentropy_core::Result;

use super::SymbolStream;
use crate::fse::{DecodeTable, EncodeTable};

struct PredefinedTables {
    encode: [EncodeTable; 3],
    decode: [DecodeTable; 3],
}

static PREDEFINED: OnceLock<Result<PredefinedTables>> = OnceLock::new();

fn build() -> Result<PredefinedTables> {
    let [ll, of, ml] = SymbolStream::ALL;
    let encode = |s: SymbolStream| EncodeTable::build(s.default_distribution(), s.default_log());
    let decode = |s: SymbolStream| DecodeTable::build(s.default_distribution(), s.default_log());
    Ok(PredefinedTables {
        encode: [encode(ll)?, encode(of)?, encode(ml)?],
        decode: [decode(ll)?, decode(of)?, decode(ml)?],
    })
}

fn predefined() -> Result<&'static PredefinedTables> {
    PREDEFINED.get_or_init(build).as_ref().map_err(Clone::clone)
}

/// Encoding table of the predefined distribution for `stream`.
#[inline]
pub fn predefined_encode_table(stream: SymbolStream) -> Result<&'static EncodeTable> {
    Ok(&predefined()?.encode[stream.index()])
}

/// Decoding table of the predefined distribution for `stream`.
#[inline]
pub fn predefined_decode_table(stream: SymbolStream) -> Result<&'static DecodeTable> {
    Ok(&predefined()?.decode[stream.index()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_logs() {
        for stream in SymbolStream::ALL {
            let enc = predefined_encode_table(stream).unwrap();
            let dec = predefined_decode_table(stream).unwrap();
            assert_eq!(enc.table_log(), stream.default_log());
            assert_eq!(dec.table_log(), stream.default_log());
            assert_eq!(dec.entries().len(), 1 << stream.default_log());
        }
    }

    #[test]
    fn test_cached_once() {
        let a = predefined_decode_table(SymbolStream::Offset).unwrap() as *const DecodeTable;
        let b = predefined_decode_table(SymbolStream::Offset).unwrap() as *const DecodeTable;
        assert_eq!(a, b);
    }

    #[test]
    fn test_predefined_alphabets() {
        let ll = predefined_encode_table(SymbolStream::LiteralLength).unwrap();
        assert_eq!(ll.max_symbol(), 35);
        let of = predefined_encode_table(SymbolStream::Offset).unwrap();
        assert_eq!(of.max_symbol(), 28);
        let ml = predefined_encode_table(SymbolStream::MatchLength).unwrap();
        assert_eq!(ml.max_symbol(), 52);
    }
}
