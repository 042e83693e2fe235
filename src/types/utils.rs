// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Editing helpers shared by parameter setters.

use std::fmt;

use super::ModelEnum;

/// Largest clock divisor
pub const DIVISOR_MAX: i32 = 768;

/// Divisor of one bar (whole note)
pub const DIVISOR_BAR: i32 = 192;

/// Divisors reachable with shift held, in ascending order
pub const KNOWN_DIVISORS: [i32; 19] = [
    1, 2, 3, 4, 6, 8, 12, 16, 24, 32, 48, 64, 96, 128, 192, 256, 384, 512, 768,
];

/// Clamp an enum to its valid variants
pub fn clamped_enum<E: ModelEnum>(value: E) -> E {
    E::from_index(value.index())
}

/// Step an enum by `delta` variants, saturating at both ends
pub fn adjusted_enum<E: ModelEnum>(value: E, delta: i32) -> E {
    let index = (value.index() as i32 + delta).clamp(0, E::COUNT as i32 - 1);
    E::from_index(index as usize)
}

/// Clamp a clock divisor into `1..=DIVISOR_MAX`
pub fn clamp_divisor(divisor: i32) -> i32 {
    divisor.clamp(1, DIVISOR_MAX)
}

/// Index of `divisor` in [`KNOWN_DIVISORS`], if it is one
pub fn divisor_to_index(divisor: i32) -> Option<usize> {
    KNOWN_DIVISORS.iter().position(|&d| d == divisor)
}

/// Known divisor at `index`
pub fn index_to_divisor(index: usize) -> Option<i32> {
    KNOWN_DIVISORS.get(index).copied()
}

/// Adjust a divisor; with `shift` jump to the next/previous known divisor
pub fn adjusted_by_divisor(divisor: i32, delta: i32, shift: bool) -> i32 {
    if !shift {
        return clamp_divisor(divisor + delta);
    }
    if delta > 0 {
        KNOWN_DIVISORS
            .iter()
            .copied()
            .find(|&d| d > divisor)
            .unwrap_or(DIVISOR_MAX)
    } else if delta < 0 {
        KNOWN_DIVISORS
            .iter()
            .rev()
            .copied()
            .find(|&d| d < divisor)
            .unwrap_or(1)
    } else {
        divisor
    }
}

/// Adjust a value; with `shift` double or halve it
pub fn adjusted_by_power_of_two(value: i32, delta: i32, shift: bool) -> i32 {
    if !shift {
        return value + delta;
    }
    if delta > 0 {
        if value <= 0 {
            1
        } else {
            value * 2
        }
    } else if delta < 0 {
        value / 2
    } else {
        value
    }
}

/// Adjust a value in multiples of `step`; with `snap` round onto the grid
pub fn adjusted_by_step(value: i32, delta: i32, step: i32, snap: bool) -> i32 {
    if snap {
        let snapped = (value / step) * step;
        snapped + delta * step
    } else {
        value + delta
    }
}

/// Rotate `steps[first..=last]` by `direction` positions
pub fn shift_steps<T: Copy>(steps: &mut [T], first: usize, last: usize, direction: i32) {
    if first >= last || last >= steps.len() {
        return;
    }
    let range = &mut steps[first..=last];
    let len = range.len();
    let amount = direction.rem_euclid(len as i32) as usize;
    range.rotate_right(amount);
}

/// Move only the `selected` steps inside `[first, last]` by `direction`.
///
/// Selected steps move (wrapping inside the range); unselected steps keep
/// their relative order and fill the positions left behind.
pub fn shift_selected_steps<T: Copy>(
    steps: &mut [T],
    selected: u64,
    first: usize,
    last: usize,
    direction: i32,
) {
    if first >= last || last >= steps.len() || last >= 64 {
        return;
    }
    let len = (last - first + 1) as i32;
    let mut original = [steps[first]; 64];
    original[..len as usize].copy_from_slice(&steps[first..=last]);
    let mut placed = [false; 64];

    for offset in 0..len as usize {
        if selected & (1u64 << (first + offset)) != 0 {
            let target = (offset as i32 + direction).rem_euclid(len) as usize;
            steps[first + target] = original[offset];
            placed[target] = true;
        }
    }

    let mut free = (0..len as usize).filter(|&i| !placed[i]);
    for offset in 0..len as usize {
        if selected & (1u64 << (first + offset)) == 0 {
            if let Some(target) = free.next() {
                steps[first + target] = original[offset];
            }
        }
    }
}

/// Copy `steps[first..=last]` directly behind itself, as far as it fits
pub fn duplicate_steps<T: Copy>(steps: &mut [T], first: usize, last: usize) {
    if first > last || last >= steps.len() {
        return;
    }
    let len = last - first + 1;
    for i in 0..len {
        let dst = last + 1 + i;
        if dst >= steps.len() {
            break;
        }
        steps[dst] = steps[first + i];
    }
}

/// Print a divisor as a note value (`1/16`, `1/8T`) or in bars
pub fn print_divisor(out: &mut dyn fmt::Write, divisor: i32) -> fmt::Result {
    if divisor % DIVISOR_BAR == 0 {
        return write!(out, "{}", divisor / DIVISOR_BAR);
    }
    if DIVISOR_BAR % divisor != 0 {
        return write!(out, "{}", divisor);
    }
    let fraction = DIVISOR_BAR / divisor;
    if fraction % 3 == 0 {
        write!(out, "1/{}T", fraction * 2 / 3)
    } else {
        write!(out, "1/{}", fraction)
    }
}

/// Print a boolean as "yes"/"no"
pub fn print_yes_no(out: &mut dyn fmt::Write, value: bool) -> fmt::Result {
    out.write_str(if value { "yes" } else { "no" })
}

/// Store a name in a fixed buffer.
///
/// Only printable ASCII is kept; the name is truncated to the buffer and
/// padded with zeros.
pub fn name_to_bytes<const N: usize>(name: &str) -> [u8; N] {
    let mut bytes = [0u8; N];
    for (slot, b) in bytes
        .iter_mut()
        .zip(name.bytes().filter(|b| b.is_ascii_graphic() || *b == b' '))
    {
        *slot = b;
    }
    bytes
}

/// Read a name stored by [`name_to_bytes`]
pub fn name_from_bytes(bytes: &[u8]) -> &str {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..len]).unwrap_or("")
}
