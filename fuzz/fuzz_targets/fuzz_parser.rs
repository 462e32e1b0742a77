#![no_main]
use std::cell::RefCell;

use arbitrary::Arbitrary;
use jsonloom::{JsonParser, ParserConfig, ParserOptions};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use serde_json::{Map, Value};

const HEADER: usize = 2; // 16 option bits

thread_local! {
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

/// Separators the lenient options accept between tokens.
static GAP_TABLE: &[&[u8]] = &[
    b" ",
    b"\t",
    b"\n",
    b"\r",
    b"\x0c",
    b"/* c */",
    b"// c\n",
    b",",
];

/// Fragments that exercise special keys and leniencies.
static SNIPPET_TABLE: &[&[u8]] = &[
    br#"{"$ref":"$"}"#,
    br#"{"$ref":"@"}"#,
    br#"{"$ref":".."}"#,
    br#"{"$ref":"$.a[0]"}"#,
    br#"{"@type":"jsonloom.Object","a":[1]}"#,
    br#"{"@type":"java.lang.Runtime"}"#,
    b"{a:'b',}",
    b"{1:2,[3]:4}",
    b"x'0AFF'",
    b"undefined",
    br#""2024-02-29T10:00:00+01:00""#,
];

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        data[..HEADER].copy_from_slice(&with_rng(|rng| (rng.next_u32() as u16).to_le_bytes()));

        let mut prefix = HEADER;

        while prefix < size {
            let limit = max_size - prefix;

            prefix += append_gap(&mut data[prefix..], limit);
            prefix += append_value(&mut data[prefix..], size, max_size - prefix);
            prefix += append_gap(&mut data[prefix..], max_size - prefix);
        }

        prefix
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

/// Append 1‒N separators to `buf`, never exceeding `limit`. Returns the number
/// of bytes written.
fn append_gap(buf: &mut [u8], limit: usize) -> usize {
    with_rng(|rng| {
        if limit == 0 {
            return 0;
        }

        let n = rng.random_range(1..=limit.min(8));
        let mut written = 0;

        for _ in 0..n {
            let w = GAP_TABLE[rng.random_range(0..GAP_TABLE.len())];
            if written + w.len() > limit {
                break;
            }

            buf[written..written + w.len()].copy_from_slice(w);
            written += w.len();
        }
        written
    })
}

fn append_value(data: &mut [u8], size: usize, limit: usize) -> usize {
    if limit == 0 {
        return 0;
    }
    if with_rng(|rng| rng.random_ratio(1, 4)) {
        let snippet = with_rng(|rng| SNIPPET_TABLE[rng.random_range(0..SNIPPET_TABLE.len())]);
        let len = snippet.len().min(limit);
        data[..len].copy_from_slice(&snippet[..len]);
        return len;
    }

    let value = loop {
        let s = with_rng(|rng| rng.random_range(size / 2..size * 2 + 1).min(limit));
        let bytes: Vec<u8> = with_rng(|rng| (0..s).map(|_| rng.random::<u8>()).collect());
        if let Ok(value) = ArbitraryValue::arbitrary(&mut arbitrary::Unstructured::new(&bytes)) {
            break value;
        }
    };

    let serialized = serde_json::to_vec(&value.0).expect("Failed to serialize arbitrary value");

    let len = serialized.len().min(limit);
    data[..len].copy_from_slice(&serialized[..len]);

    len
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

#[derive(Debug)]
struct ArbitraryValue(Value);

impl<'a> Arbitrary<'a> for ArbitraryValue {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        let node_type = u.choose_index(21)?;
        let value = match node_type {
            0 => Value::Null,
            1 => Value::Bool(u.arbitrary()?),
            2 => {
                let n: f64 = u.arbitrary()?;
                Value::Number(
                    serde_json::Number::from_f64(n).ok_or(arbitrary::Error::IncorrectFormat)?,
                )
            }
            3..=10 => Value::String(u.arbitrary()?),
            11..=15 => {
                let elems: Vec<ArbitraryValue> = u.arbitrary()?;
                Value::Array(elems.into_iter().map(|v| v.0).collect())
            }
            16..=20 => {
                let m: Vec<(String, ArbitraryValue)> = u.arbitrary()?;
                Value::Object(Map::from_iter(m.into_iter().map(|(k, v)| (k, v.0))))
            }
            _ => Err(arbitrary::Error::IncorrectFormat)?,
        };
        Ok(ArbitraryValue(value))
    }
}

fn options(flags: u16) -> ParserOptions {
    let bit = |n: u16| flags & (1 << n) != 0;
    ParserOptions {
        allow_comments: bit(0),
        allow_unquoted_field_names: bit(1),
        allow_single_quotes: bit(2),
        allow_iso8601_date_format: bit(3),
        allow_arbitrary_commas: bit(4),
        use_big_decimal: bit(5),
        disable_circular_reference_detect: bit(6),
        disable_special_key_detect: bit(7),
        safe_mode: bit(8),
        support_auto_type: bit(9),
        ignore_auto_type: bit(10),
        ordered_field: bit(11),
        use_object_array: bit(12),
        non_string_key_as_string: bit(13),
        trim_string_field_value: bit(14),
    }
}

fn parser(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let flags = u16::from_le_bytes([data[0], data[1]]);
    let text = String::from_utf8_lossy(&data[HEADER..]).into_owned();
    let options = options(flags);

    let config = ParserConfig::new();
    let Ok(value) = JsonParser::with_config(&text, options, &config).parse() else {
        return;
    };

    // Render, including cyclic links, then feed the rendering back in.
    let rendered = value.to_string();
    let _ = JsonParser::with_config(&rendered, options, &config).parse();
}

fuzz_target!(|data: &[u8]| parser(data));
