//! Stable display names and colors for species.
//!
//! Both are pure functions of the species id and kind, so a restored world
//! shows the same labels it had when it was saved.

use crate::organism::OrganismKind;

static GENUS_HEADS: &[&str] = &[
    "Ar", "Bel", "Cal", "Dor", "Esk", "Fen", "Gal", "Hal", "Iv", "Jun", "Kel", "Lum", "Mor",
    "Nev", "Or", "Pel", "Quin", "Ros", "Sil", "Tal", "Ul", "Ver", "Wyn", "Xan", "Yl", "Zor",
];

static GENUS_TAILS: &[&str] = &[
    "ora", "ix", "eus", "ana", "ops", "ella", "ium", "odon", "ara", "esa", "ulus", "ina", "yx",
    "amus", "ethra", "ocis",
];

static GRAZER_EPITHETS: &[&str] = &[
    "pratensis", "herbivora", "mitis", "silvestris", "campestris", "lenta", "florens", "placida",
    "viridis", "palustris", "frondosa", "segnis",
];

static HUNTER_EPITHETS: &[&str] = &[
    "rapax", "ferox", "celer", "atrox", "vorax", "acuta", "saeva", "fulminans", "vigilans",
    "rabida", "audax", "insidians",
];

fn mix32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

fn salt(kind: OrganismKind) -> u32 {
    match kind {
        OrganismKind::Grazer => 0x9e37_79b9,
        OrganismKind::Hunter => 0x85eb_ca6b,
    }
}

fn pick<'a>(list: &'a [&'a str], h: u32) -> &'a str {
    list[h as usize % list.len()]
}

/// Binomial-style name, e.g. "Calora pratensis"
pub fn species_name(kind: OrganismKind, id: u32) -> String {
    let h = mix32(id ^ salt(kind));
    let head = pick(GENUS_HEADS, h);
    let tail = pick(GENUS_TAILS, mix32(h ^ 0x51));
    let epithet = match kind {
        OrganismKind::Grazer => pick(GRAZER_EPITHETS, mix32(h ^ 0xa7)),
        OrganismKind::Hunter => pick(HUNTER_EPITHETS, mix32(h ^ 0xa7)),
    };
    format!("{}{} {}", head, tail, epithet)
}

/// RGB color; greens and teals for grazers, reds and ambers for hunters
pub fn species_color(kind: OrganismKind, id: u32) -> [u8; 3] {
    let h = mix32(id.wrapping_mul(2_654_435_761) ^ salt(kind));
    let unit = |shift: u32| ((h >> shift) & 0xff) as f32 / 255.0;

    let hue = match kind {
        OrganismKind::Grazer => 70.0 + unit(0) * 120.0,
        OrganismKind::Hunter => (330.0 + unit(0) * 80.0) % 360.0,
    };
    let saturation = 0.55 + unit(8) * 0.3;
    let value = 0.75 + unit(16) * 0.2;
    hsv_to_rgb(hue, saturation, value)
}

fn hsv_to_rgb(hue: f32, s: f32, v: f32) -> [u8; 3] {
    let c = v * s;
    let hp = (hue % 360.0) / 60.0;
    let x = c * (1.0 - ((hp % 2.0) - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    let to_byte = |ch: f32| ((ch + m).clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}
