//! Code 128 symbol encoding
//!
//! Turns a payload into the module widths of a Code 128 symbol. Digit runs
//! are packed two per symbol in code set C, printable ASCII uses set B and
//! control characters use set A.

use crate::error::BarcodeError;

/// Bar/space widths of symbol values 0..=105 (each sums to 11 modules)
const PATTERNS: [&str; 106] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232",
];

/// Stop pattern including the terminating bar
const STOP_PATTERN: &str = "2331112";

const START_A: u8 = 103;
const START_B: u8 = 104;
const START_C: u8 = 105;
const SWITCH_C: u8 = 99;
const SWITCH_B: u8 = 100;
const SWITCH_A: u8 = 101;

/// Code set in force while encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

impl CodeSet {
    fn start_value(self) -> u8 {
        match self {
            CodeSet::A => START_A,
            CodeSet::B => START_B,
            CodeSet::C => START_C,
        }
    }

    /// Symbol value that switches into this set
    fn switch_value(self) -> u8 {
        match self {
            CodeSet::A => SWITCH_A,
            CodeSet::B => SWITCH_B,
            CodeSet::C => SWITCH_C,
        }
    }
}

/// An encoded Code 128 symbol: data values plus checksum, start and stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code128 {
    values: Vec<u8>,
}

impl Code128 {
    /// Encode `payload`, choosing code sets automatically
    pub fn encode(payload: &str) -> Result<Self, BarcodeError> {
        if payload.is_empty() {
            return Err(BarcodeError::EmptyPayload);
        }
        if let Some((position, ch)) = payload.char_indices().find(|(_, c)| !c.is_ascii()) {
            return Err(BarcodeError::UnsupportedCharacter { ch, position });
        }

        let bytes = payload.as_bytes();
        let mut values = Vec::with_capacity(bytes.len() + 3);
        let mut current: Option<CodeSet> = None;
        let mut i = 0;

        while i < bytes.len() {
            let run = digit_run(&bytes[i..]);
            let whole_even_numeric = i == 0 && run == bytes.len() && run >= 2 && run % 2 == 0;

            if run >= 4 || whole_even_numeric {
                // An odd run leaves its first digit to set A/B so the pairs end flush
                if run % 2 == 1 {
                    let set = set_for_byte(bytes[i], current);
                    push_set(&mut values, &mut current, set);
                    values.push(value_in_set(bytes[i], set));
                    i += 1;
                }
                push_set(&mut values, &mut current, CodeSet::C);
                let end = i + (run / 2) * 2;
                while i < end {
                    values.push((bytes[i] - b'0') * 10 + (bytes[i + 1] - b'0'));
                    i += 2;
                }
            } else {
                let set = set_for_byte(bytes[i], current);
                push_set(&mut values, &mut current, set);
                values.push(value_in_set(bytes[i], set));
                i += 1;
            }
        }

        let checksum = values
            .iter()
            .enumerate()
            .map(|(pos, &v)| u32::from(v) * (pos.max(1) as u32))
            .sum::<u32>()
            % 103;
        values.push(checksum as u8);

        Ok(Self { values })
    }

    /// Start value, data values and checksum (stop excluded)
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Module widths alternating bar, space, bar, ... starting with a bar
    pub fn widths(&self) -> Vec<u8> {
        self.values
            .iter()
            .map(|&v| PATTERNS[usize::from(v)])
            .chain(std::iter::once(STOP_PATTERN))
            .flat_map(|p| p.bytes().map(|b| b - b'0'))
            .collect()
    }

    /// Total symbol width in modules, quiet zones excluded
    pub fn module_count(&self) -> u32 {
        self.widths().iter().map(|&w| u32::from(w)).sum()
    }

    /// Bars as (start module, width in modules)
    pub fn bars(&self) -> Vec<(u32, u32)> {
        let mut x = 0u32;
        let mut bars = Vec::new();
        for (idx, w) in self.widths().into_iter().enumerate() {
            let w = u32::from(w);
            if idx % 2 == 0 {
                bars.push((x, w));
            }
            x += w;
        }
        bars
    }
}

/// Emit the start code or a switch when `set` differs from the current one
fn push_set(values: &mut Vec<u8>, current: &mut Option<CodeSet>, set: CodeSet) {
    match *current {
        None => values.push(set.start_value()),
        Some(active) if active != set => values.push(set.switch_value()),
        Some(_) => return,
    }
    *current = Some(set);
}

fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Pick A or B for a single character, staying in A when it can
fn set_for_byte(byte: u8, current: Option<CodeSet>) -> CodeSet {
    if byte < 32 {
        CodeSet::A
    } else if byte >= 96 {
        CodeSet::B
    } else if current == Some(CodeSet::A) {
        CodeSet::A
    } else {
        CodeSet::B
    }
}

fn value_in_set(byte: u8, set: CodeSet) -> u8 {
    match set {
        CodeSet::A if byte < 32 => byte + 64,
        CodeSet::A | CodeSet::B => byte - 32,
        CodeSet::C => byte - b'0',
    }
}
