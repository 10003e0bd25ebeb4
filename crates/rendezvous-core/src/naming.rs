//! Deterministic display names.
//!
//! A peer's display name is `names.display_name(hash_code(id))`, so a peer
//! that reconnects with the same id keeps its name.

use crate::ids::PeerId;

/// Rolling 32-bit signed string hash over UTF-16 code units.
///
/// `h = h * 31 + unit` with two's-complement wrap-around. Browser clients
/// compute the same value, so it must stay bit-for-bit stable.
pub fn hash_code(value: &str) -> i32 {
    value.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// Produces a display name from a numeric seed.
///
/// Implementations must be pure: the same seed always yields the same name.
pub trait NameGenerator: Send + Sync {
    /// Display name for `seed`.
    fn display_name(&self, seed: i32) -> String;
}

/// Display name for a peer id.
pub fn display_name_for(id: &PeerId, names: &dyn NameGenerator) -> String {
    names.display_name(hash_code(id.as_str()))
}

/// `"<Color> <Animal>"` names picked from fixed word lists.
#[derive(Clone, Copy, Debug, Default)]
pub struct WordListNames;

const COLORS: &[&str] = &[
    "Amber", "Aqua", "Azure", "Beige", "Black", "Blue", "Bronze", "Brown", "Coral", "Crimson",
    "Cyan", "Gold", "Gray", "Green", "Indigo", "Ivory", "Jade", "Lavender", "Lime", "Magenta",
    "Maroon", "Mint", "Navy", "Olive", "Orange", "Peach", "Pink", "Plum", "Purple", "Red",
    "Rose", "Ruby", "Salmon", "Sapphire", "Scarlet", "Silver", "Tan", "Teal", "Turquoise",
    "Violet", "White", "Yellow",
];

const ANIMALS: &[&str] = &[
    "Albatross", "Alpaca", "Antelope", "Badger", "Beaver", "Bison", "Buffalo", "Camel",
    "Chinchilla", "Caribou", "Cheetah", "Cobra", "Cougar", "Coyote", "Crane", "Crow", "Dolphin",
    "Eagle", "Elk", "Falcon", "Ferret", "Finch", "Flamingo", "Fox", "Gazelle", "Gecko",
    "Giraffe", "Gorilla", "Hedgehog", "Heron", "Hippo", "Ibis", "Jaguar", "Kangaroo", "Koala",
    "Lemur", "Leopard", "Lion", "Llama", "Lobster", "Lynx", "Magpie", "Marmot", "Meerkat",
    "Mole", "Moose", "Narwhal", "Newt", "Ocelot", "Octopus", "Otter", "Owl", "Panda", "Panther",
    "Parrot", "Pelican", "Penguin", "Puffin", "Quail", "Rabbit", "Raccoon", "Raven", "Salmon",
    "Seal", "Shark", "Sloth", "Sparrow", "Squid", "Swan", "Tiger", "Toucan", "Turtle", "Walrus",
    "Weasel", "Whale", "Wolf", "Wombat", "Yak", "Zebra",
];

impl NameGenerator for WordListNames {
    fn display_name(&self, seed: i32) -> String {
        #[allow(clippy::cast_sign_loss)]
        let first = mix(seed as u32);
        let second = mix(first);
        format!("{} {}", pick(COLORS, first), pick(ANIMALS, second))
    }
}

fn pick(words: &'static [&'static str], value: u32) -> &'static str {
    words[value as usize % words.len()]
}

/// Integer avalanche step; spreads neighbouring seeds across the word lists.
fn mix(value: u32) -> u32 {
    let mut t = value.wrapping_add(0x6D2B_79F5);
    t = (t ^ (t >> 15)).wrapping_mul(t | 1);
    t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
    t ^ (t >> 14)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_empty_string_is_zero() {
        assert_eq!(hash_code(""), 0);
    }

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(hash_code("a"), 97);
        assert_eq!(hash_code("hello"), 99_162_322);
        // wraps past i32::MAX during accumulation
        assert_eq!(hash_code("hello world"), 1_794_106_052);
        // wraps to exactly i32::MIN
        assert_eq!(hash_code("polygenelubricants"), i32::MIN);
    }

    #[test]
    fn hash_uses_utf16_code_units() {
        // U+1F600 is a surrogate pair: 0xD83D 0xDE00.
        let expected = 0xD83Di32.wrapping_mul(31).wrapping_add(0xDE00);
        assert_eq!(hash_code("\u{1F600}"), expected);
    }

    #[test]
    fn same_seed_same_name() {
        let names = WordListNames;
        assert_eq!(names.display_name(42), names.display_name(42));
        assert_eq!(names.display_name(-7), names.display_name(-7));
    }

    #[test]
    fn name_is_color_and_animal() {
        let name = WordListNames.display_name(123_456);
        let (color, animal) = name.split_once(' ').unwrap();
        assert!(COLORS.contains(&color));
        assert!(ANIMALS.contains(&animal));
    }

    #[test]
    fn names_vary_across_seeds() {
        let names: std::collections::HashSet<String> =
            (0..64).map(|seed| WordListNames.display_name(seed)).collect();
        assert!(names.len() > 32);
    }

    #[test]
    fn display_name_for_same_id_is_stable() {
        let id = PeerId::from("5b4c1a7e-0000-4000-8000-000000000001");
        let first = display_name_for(&id, &WordListNames);
        let again = display_name_for(&PeerId::from(id.as_str()), &WordListNames);
        assert_eq!(first, again);
    }
}
