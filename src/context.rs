//! Context classifiers for the bit-plane coding passes.
//!
//! All classifiers look at a 3x3 significance window centred on the current
//! coefficient; blocks are scanned against a zero-bordered significance map,
//! so boundary windows arrive already padded.

use crate::error::EbcotError;
use crate::image::SubbandOrientation;

/// Run-length context label.
pub const CX_RUN: u8 = 17;
/// Uniform context label.
pub const CX_UNIFORM: u8 = 18;

/// 3x3 significance window; `window[1][1]` is the current coefficient.
pub type SigWindow = [[u8; 3]; 3];

/// Context label (0..=8) for a not-yet-significant coefficient.
///
/// LL and LH share one sub-table; HL swaps the roles of the horizontal and
/// vertical neighbour counts; HH keys on the diagonal count first.
pub fn zero_coding(window: &SigWindow, orientation: SubbandOrientation) -> u8 {
    let h = window[1][0] + window[1][2];
    let v = window[0][1] + window[2][1];
    let d = window[0][0] + window[0][2] + window[2][0] + window[2][2];
    match orientation {
        SubbandOrientation::LL | SubbandOrientation::LH => zc_low_pass(h, v, d),
        SubbandOrientation::HL => zc_low_pass(v, h, d),
        SubbandOrientation::HH => zc_high_pass(d, h + v),
    }
}

fn zc_low_pass(h: u8, v: u8, d: u8) -> u8 {
    if h == 2 {
        8
    } else if h == 1 && v >= 1 {
        7
    } else if h == 1 && d >= 1 {
        6
    } else if h == 1 {
        5
    } else if v == 2 {
        4
    } else if v == 1 {
        3
    } else if d >= 2 {
        2
    } else if d == 1 {
        1
    } else {
        0
    }
}

fn zc_high_pass(d: u8, hv: u8) -> u8 {
    if d >= 3 {
        8
    } else if d == 2 && hv >= 1 {
        7
    } else if d == 2 {
        6
    } else if d == 1 && hv >= 2 {
        5
    } else if d == 1 && hv == 1 {
        4
    } else if d == 1 {
        3
    } else if hv >= 2 {
        2
    } else if hv == 1 {
        1
    } else {
        0
    }
}

// Contribution of one neighbour pair to the sign classification. Neighbour
// signs are not consulted: a significant neighbour always counts +1, so the
// negative class never arises from this classifier.
fn axis_class(a: u8, b: u8) -> i8 {
    if a == 0 && b == 0 {
        0
    } else {
        1
    }
}

/// Sign prediction and context label (9..=13) for a coefficient whose bit
/// just became 1. The emitted decision is `sign XOR prediction`.
pub fn sign_coding(window: &SigWindow) -> (u8, u8) {
    let h = axis_class(window[1][0], window[1][2]);
    let v = axis_class(window[0][1], window[2][1]);
    let prediction = match (h, v) {
        (0, -1) | (-1, 1) | (-1, 0) | (-1, -1) => 1,
        _ => 0,
    };
    let context = match (h, v) {
        (1, 1) | (-1, -1) => 13,
        (1, 0) | (-1, 0) => 12,
        (1, -1) | (-1, 1) => 11,
        (0, 1) | (0, -1) => 10,
        _ => 9,
    };
    (prediction, context)
}

/// Recover a sign bit from its decision, verifying that the context the
/// window predicts matches the label carried by the codestream.
pub fn sign_decoding(window: &SigWindow, cx: u8, d: u8) -> Result<u8, EbcotError> {
    let (prediction, computed) = sign_coding(window);
    if computed != cx {
        return Err(EbcotError::SignContextMismatch {
            computed,
            found: cx,
        });
    }
    Ok(d ^ prediction)
}

/// Context label (14..=16) for refining an already-significant coefficient.
pub fn magnitude_refinement_coding(window: &SigWindow, refined: u8) -> u8 {
    let neighbours: u8 = window.iter().flatten().sum::<u8>() - window[1][1];
    if refined == 1 {
        16
    } else if neighbours >= 1 {
        15
    } else {
        14
    }
}

/// Outcome of run-length coding a four-coefficient stripe column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLength {
    /// The whole column is zero at this plane: one cx-17 zero decision.
    AllZero,
    /// The first set bit sits at `position` (0..=3): three decisions
    /// (cx 17, 18, 18) followed by a sign decision. `position + 1` rows
    /// of the column are accounted for.
    Terminated { position: u8 },
}

/// Classify the current-plane bits of a stripe column whose neighbourhood
/// holds no significance.
pub fn run_length_coding(column: [u8; 4]) -> RunLength {
    match column.iter().position(|&bit| bit == 1) {
        None => RunLength::AllZero,
        Some(position) => RunLength::Terminated {
            position: position as u8,
        },
    }
}

/// Re-derive a run-length outcome from up to three decoded (CX, D) pairs.
pub fn run_length_decoding(cx: [u8; 3], d: [u8; 3]) -> Result<RunLength, EbcotError> {
    if cx[0] == CX_RUN && d[0] == 0 {
        return Ok(RunLength::AllZero);
    }
    if cx[0] == CX_RUN && cx[1] == CX_UNIFORM && cx[2] == CX_UNIFORM && d[0] == 1 {
        return Ok(RunLength::Terminated {
            position: (d[1] << 1) | d[2],
        });
    }
    Err(EbcotError::InvalidRunLength)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_from(rows: [[u8; 3]; 3]) -> SigWindow {
        rows
    }

    #[test]
    fn test_zero_coding_ll_table() {
        let empty = window_from([[0, 0, 0], [0, 0, 0], [0, 0, 0]]);
        assert_eq!(zero_coding(&empty, SubbandOrientation::LL), 0);

        // Both horizontal neighbours significant.
        let h2 = window_from([[0, 0, 0], [1, 0, 1], [0, 0, 0]]);
        assert_eq!(zero_coding(&h2, SubbandOrientation::LL), 8);

        // One horizontal, one vertical.
        let hv = window_from([[0, 1, 0], [1, 0, 0], [0, 0, 0]]);
        assert_eq!(zero_coding(&hv, SubbandOrientation::LL), 7);

        // Single diagonal.
        let d1 = window_from([[1, 0, 0], [0, 0, 0], [0, 0, 0]]);
        assert_eq!(zero_coding(&d1, SubbandOrientation::LL), 1);
        assert_eq!(zero_coding(&d1, SubbandOrientation::LH), 1);
    }

    #[test]
    fn test_zero_coding_hl_swaps_axes() {
        // Two vertical neighbours read as the strong axis in HL.
        let v2 = window_from([[0, 1, 0], [0, 0, 0], [0, 1, 0]]);
        assert_eq!(zero_coding(&v2, SubbandOrientation::LL), 4);
        assert_eq!(zero_coding(&v2, SubbandOrientation::HL), 8);

        let h1 = window_from([[0, 0, 0], [1, 0, 0], [0, 0, 0]]);
        assert_eq!(zero_coding(&h1, SubbandOrientation::LL), 5);
        assert_eq!(zero_coding(&h1, SubbandOrientation::HL), 3);
    }

    #[test]
    fn test_zero_coding_hh_keys_on_diagonals() {
        let d3 = window_from([[1, 0, 1], [0, 0, 0], [1, 0, 0]]);
        assert_eq!(zero_coding(&d3, SubbandOrientation::HH), 8);

        let d1_hv1 = window_from([[1, 0, 0], [0, 0, 1], [0, 0, 0]]);
        assert_eq!(zero_coding(&d1_hv1, SubbandOrientation::HH), 4);

        let hv2 = window_from([[0, 0, 0], [1, 0, 1], [0, 0, 0]]);
        assert_eq!(zero_coding(&hv2, SubbandOrientation::HH), 2);
    }

    #[test]
    fn test_sign_coding_contexts() {
        let none = window_from([[0, 0, 0], [0, 0, 0], [0, 0, 0]]);
        assert_eq!(sign_coding(&none), (0, 9));

        let horizontal = window_from([[0, 0, 0], [1, 0, 0], [0, 0, 0]]);
        assert_eq!(sign_coding(&horizontal), (0, 12));

        let vertical = window_from([[0, 1, 0], [0, 0, 0], [0, 0, 0]]);
        assert_eq!(sign_coding(&vertical), (0, 10));

        let both = window_from([[0, 1, 0], [0, 0, 1], [0, 0, 0]]);
        assert_eq!(sign_coding(&both), (0, 13));
    }

    #[test]
    fn test_sign_decoding_detects_mismatch() {
        let horizontal = window_from([[0, 0, 0], [1, 0, 0], [0, 0, 0]]);
        assert_eq!(sign_decoding(&horizontal, 12, 1), Ok(1));
        assert_eq!(
            sign_decoding(&horizontal, 9, 1),
            Err(EbcotError::SignContextMismatch {
                computed: 12,
                found: 9
            })
        );
    }

    #[test]
    fn test_magnitude_refinement_contexts() {
        let none = window_from([[0, 0, 0], [0, 1, 0], [0, 0, 0]]);
        assert_eq!(magnitude_refinement_coding(&none, 0), 14);

        let with_neighbour = window_from([[0, 0, 1], [0, 1, 0], [0, 0, 0]]);
        assert_eq!(magnitude_refinement_coding(&with_neighbour, 0), 15);
        assert_eq!(magnitude_refinement_coding(&with_neighbour, 1), 16);
        assert_eq!(magnitude_refinement_coding(&none, 1), 16);
    }

    #[test]
    fn test_run_length_coding_patterns() {
        assert_eq!(run_length_coding([0, 0, 0, 0]), RunLength::AllZero);
        assert_eq!(
            run_length_coding([1, 0, 0, 0]),
            RunLength::Terminated { position: 0 }
        );
        assert_eq!(
            run_length_coding([0, 0, 0, 1]),
            RunLength::Terminated { position: 3 }
        );
    }

    #[test]
    fn test_run_length_decoding_patterns() {
        assert_eq!(
            run_length_decoding([CX_RUN, 0, 0], [0, 0, 0]),
            Ok(RunLength::AllZero)
        );
        assert_eq!(
            run_length_decoding([CX_RUN, CX_UNIFORM, CX_UNIFORM], [1, 1, 0]),
            Ok(RunLength::Terminated { position: 2 })
        );
        assert_eq!(
            run_length_decoding([0, 0, 0], [1, 0, 0]),
            Err(EbcotError::InvalidRunLength)
        );
        assert_eq!(
            run_length_decoding([CX_RUN, CX_UNIFORM, 0], [1, 0, 0]),
            Err(EbcotError::InvalidRunLength)
        );
    }
}
