use crate::error::RouteError;
use crate::pdf::{ascii_hex_encode, stream_object, stream_with_entries};
use crate::types::Pt;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use ttf_parser::{Face, GlyphId};

pub trait FontFace: Send + Sync {
    fn name(&self) -> &str;
    fn measure(&self, text: &str, size: Pt) -> Pt;
    fn cap_height(&self, size: Pt) -> Pt;
}

// `encode_text` returns the whole `Tj` operand, delimiters included.
// `font_objects` returns bodies numbered from `font_id` upward; the first is
// the dictionary pages reference. The encoder refuses any document holding a
// character for which `supports` is false.
pub trait PdfFont: FontFace {
    fn supports(&self, ch: char) -> bool;
    fn encode_text(&self, text: &str) -> String;
    fn font_objects(&self, font_id: usize, used: &BTreeSet<char>) -> Vec<String>;
}

// Helvetica.afm advance widths for codes 32..=126.
const HELVETICA_ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];
const HELVETICA_DEFAULT_WIDTH: u16 = 556;
const HELVETICA_CAP_HEIGHT: i32 = 718;

// Lithuanian letters WinAnsi lacks, moved onto codes it leaves unused or that
// card text never draws. Glyph names and widths are from Helvetica.afm.
const LITHUANIAN_GLYPHS: [(char, u8, &str, u16); 14] = [
    ('Ą', 0x81, "Aogonek", 667),
    ('ą', 0x82, "aogonek", 556),
    ('Č', 0x83, "Ccaron", 722),
    ('č', 0x84, "ccaron", 500),
    ('Ę', 0x86, "Eogonek", 667),
    ('ę', 0x87, "eogonek", 556),
    ('Ė', 0x88, "Edotaccent", 667),
    ('ė', 0x89, "edotaccent", 556),
    ('Į', 0x8B, "Iogonek", 278),
    ('į', 0x8C, "iogonek", 222),
    ('Ų', 0x8D, "Uogonek", 722),
    ('ų', 0x8F, "uogonek", 556),
    ('Ū', 0x90, "Umacron", 722),
    ('ū', 0x95, "umacron", 556),
];

// WinAnsi entries above 0x7F that stay in place.
const WINANSI_KEPT: [(char, u8, u16); 12] = [
    ('€', 0x80, 556),
    ('…', 0x85, 1000),
    ('Š', 0x8A, 667),
    ('Ž', 0x8E, 611),
    ('‘', 0x91, 222),
    ('’', 0x92, 222),
    ('“', 0x93, 333),
    ('”', 0x94, 333),
    ('–', 0x96, 556),
    ('—', 0x97, 1000),
    ('š', 0x9A, 500),
    ('ž', 0x9E, 500),
];

// Built-in base-14 Helvetica, never embedded. Encoded as WinAnsi plus a
// /Differences array carrying the Lithuanian letters.
#[derive(Debug, Clone, Default)]
pub struct StandardFont;

impl StandardFont {
    pub fn helvetica() -> Self {
        StandardFont
    }

    fn code_and_width(ch: char) -> Option<(u8, u16)> {
        let code = u32::from(ch);
        if (32..=126).contains(&code) {
            return Some((code as u8, HELVETICA_ASCII_WIDTHS[(code - 32) as usize]));
        }
        if (0xA0..=0xFF).contains(&code) {
            let width = if ch == '°' { 400 } else { HELVETICA_DEFAULT_WIDTH };
            return Some((code as u8, width));
        }
        LITHUANIAN_GLYPHS
            .iter()
            .find(|(glyph, ..)| *glyph == ch)
            .map(|(_, code, _, width)| (*code, *width))
            .or_else(|| {
                WINANSI_KEPT
                    .iter()
                    .find(|(glyph, ..)| *glyph == ch)
                    .map(|(_, code, width)| (*code, *width))
            })
    }

    fn differences() -> String {
        let mut out = String::new();
        let mut next = None;
        for (_, code, name, _) in LITHUANIAN_GLYPHS {
            if next != Some(code) {
                out.push_str(&format!("{code} "));
            }
            out.push_str(&format!("/{name} "));
            next = Some(code + 1);
        }
        out.trim_end().to_string()
    }
}

impl FontFace for StandardFont {
    fn name(&self) -> &str {
        "Helvetica"
    }

    fn measure(&self, text: &str, size: Pt) -> Pt {
        let units: i32 = text
            .chars()
            .map(|ch| Self::code_and_width(ch).map_or(HELVETICA_DEFAULT_WIDTH, |(_, w)| w))
            .map(i32::from)
            .sum();
        size.mul_ratio(units, 1000)
    }

    fn cap_height(&self, size: Pt) -> Pt {
        size.mul_ratio(HELVETICA_CAP_HEIGHT, 1000)
    }
}

impl PdfFont for StandardFont {
    fn supports(&self, ch: char) -> bool {
        Self::code_and_width(ch).is_some()
    }

    fn encode_text(&self, text: &str) -> String {
        let mut out = String::from("(");
        for ch in text.chars() {
            let code = Self::code_and_width(ch).map_or(b'?', |(code, _)| code);
            match code {
                b'(' | b')' | b'\\' => {
                    out.push('\\');
                    out.push(code as char);
                }
                0x20..=0x7E => out.push(code as char),
                _ => out.push_str(&format!("\\{code:03o}")),
            }
        }
        out.push(')');
        out
    }

    fn font_objects(&self, _font_id: usize, _used: &BTreeSet<char>) -> Vec<String> {
        vec![format!(
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding << /Type /Encoding /BaseEncoding /WinAnsiEncoding /Differences [{}] >> >>",
            Self::differences()
        )]
    }
}

// Scaled to 1000 units per em.
#[derive(Debug, Clone)]
struct EmbeddedMetrics {
    units_per_em: u16,
    ascent: i32,
    descent: i32,
    cap_height: i32,
    bbox: [i32; 4],
    default_width: u16,
}

// TrueType or CFF-flavoured OpenType font, embedded whole and addressed by
// glyph id through Identity-H.
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    name: String,
    data: Vec<u8>,
    metrics: EmbeddedMetrics,
    cff: bool,
}

impl TrueTypeFont {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RouteError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let stem = path.file_stem().and_then(|stem| stem.to_str());
        Self::from_bytes(data, stem)
    }

    pub fn from_bytes(data: Vec<u8>, source_name: Option<&str>) -> Result<Self, RouteError> {
        let source = source_name.unwrap_or("EmbeddedFont");
        let face = Face::parse(&data, 0)
            .map_err(|err| RouteError::Font(format!("{source}: {err}")))?;

        let units_per_em = face.units_per_em().max(1);
        let scale = |value: i16| per_mille(i32::from(value), units_per_em);
        let ascent = scale(face.ascender());
        let bounds = face.global_bounding_box();
        let metrics = EmbeddedMetrics {
            units_per_em,
            ascent,
            descent: scale(face.descender()),
            cap_height: face.capital_height().map_or(ascent, scale),
            bbox: [
                scale(bounds.x_min),
                scale(bounds.y_min),
                scale(bounds.x_max),
                scale(bounds.y_max),
            ],
            default_width: face
                .glyph_index(' ')
                .and_then(|gid| face.glyph_hor_advance(gid))
                .map_or(500, |advance| advance_per_mille(advance, units_per_em)),
        };
        let cff = face.tables().cff.is_some();
        let name = postscript_name(&face).unwrap_or_else(|| source.to_string());

        Ok(Self {
            name,
            data,
            metrics,
            cff,
        })
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }

    fn width(&self, face: &Face<'_>, gid: GlyphId) -> u16 {
        face.glyph_hor_advance(gid)
            .map_or(self.metrics.default_width, |advance| {
                advance_per_mille(advance, self.metrics.units_per_em)
            })
    }

    // First character seen for each glyph, keyed by glyph id.
    fn glyphs_for(&self, face: &Face<'_>, used: &BTreeSet<char>) -> BTreeMap<u16, char> {
        let mut glyphs = BTreeMap::new();
        for &ch in used {
            if let Some(gid) = face.glyph_index(ch) {
                glyphs.entry(gid.0).or_insert(ch);
            }
        }
        glyphs
    }

    fn descriptor(&self, base: &str, file_id: usize) -> String {
        let m = &self.metrics;
        let file_key = if self.cff { "FontFile3" } else { "FontFile2" };
        format!(
            "<< /Type /FontDescriptor /FontName /{base} /Flags 32 /FontBBox [{} {} {} {}] /ItalicAngle 0 /Ascent {} /Descent {} /CapHeight {} /StemV 80 /{file_key} {file_id} 0 R >>",
            m.bbox[0], m.bbox[1], m.bbox[2], m.bbox[3], m.ascent, m.descent, m.cap_height
        )
    }

    fn font_file(&self) -> String {
        let subtype = if self.cff { " /Subtype /OpenType" } else { "" };
        let entries = format!(
            " /Length1 {} /Filter /ASCIIHexDecode{subtype}",
            self.data.len()
        );
        stream_with_entries(&entries, &format!("{}>", ascii_hex_encode(&self.data)))
    }
}

impl FontFace for TrueTypeFont {
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(&self, text: &str, size: Pt) -> Pt {
        let units: i32 = match self.face() {
            Some(face) => text
                .chars()
                .map(|ch| {
                    let gid = face.glyph_index(ch).unwrap_or(GlyphId(0));
                    i32::from(self.width(&face, gid))
                })
                .sum(),
            None => i32::from(self.metrics.default_width) * text.chars().count() as i32,
        };
        size.mul_ratio(units, 1000)
    }

    fn cap_height(&self, size: Pt) -> Pt {
        size.mul_ratio(self.metrics.cap_height, 1000)
    }
}

impl PdfFont for TrueTypeFont {
    fn supports(&self, ch: char) -> bool {
        self.face().is_some_and(|face| face.glyph_index(ch).is_some())
    }

    fn encode_text(&self, text: &str) -> String {
        let gids: String = match self.face() {
            Some(face) => text
                .chars()
                .map(|ch| format!("{:04X}", face.glyph_index(ch).map_or(0, |gid| gid.0)))
                .collect(),
            None => String::new(),
        };
        format!("<{gids}>")
    }

    fn font_objects(&self, font_id: usize, used: &BTreeSet<char>) -> Vec<String> {
        let (cid_id, descriptor_id, file_id, cmap_id) =
            (font_id + 1, font_id + 2, font_id + 3, font_id + 4);
        let base = pdf_name(&self.name);
        let (glyphs, widths) = match self.face() {
            Some(face) => {
                let glyphs = self.glyphs_for(&face, used);
                let widths: Vec<String> = glyphs
                    .keys()
                    .map(|gid| format!("{gid} [{}]", self.width(&face, GlyphId(*gid))))
                    .collect();
                (glyphs, widths)
            }
            None => (BTreeMap::new(), Vec::new()),
        };
        let cid_kind = if self.cff {
            "/Subtype /CIDFontType0"
        } else {
            "/Subtype /CIDFontType2 /CIDToGIDMap /Identity"
        };

        vec![
            format!(
                "<< /Type /Font /Subtype /Type0 /BaseFont /{base} /Encoding /Identity-H /DescendantFonts [{cid_id} 0 R] /ToUnicode {cmap_id} 0 R >>"
            ),
            format!(
                "<< /Type /Font {cid_kind} /BaseFont /{base} /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> /FontDescriptor {descriptor_id} 0 R /DW {} /W [{}] >>",
                self.metrics.default_width,
                widths.join(" ")
            ),
            self.descriptor(&base, file_id),
            self.font_file(),
            stream_object(&to_unicode_cmap(&glyphs)),
        ]
    }
}

const CMAP_HEAD: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
";
const CMAP_TAIL: &str = "endcmap
CMapName currentdict /CMap defineresource pop
end
end";

fn to_unicode_cmap(glyphs: &BTreeMap<u16, char>) -> String {
    let pairs: Vec<String> = glyphs
        .iter()
        .map(|(gid, ch)| {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            format!("<{gid:04X}> <{utf16}>")
        })
        .collect();
    let mut out = String::from(CMAP_HEAD);
    // A bfchar block holds at most 100 pairs.
    for block in pairs.chunks(100) {
        out.push_str(&format!("{} beginbfchar\n{}\nendbfchar\n", block.len(), block.join("\n")));
    }
    out.push_str(CMAP_TAIL);
    out
}

fn postscript_name(face: &Face<'_>) -> Option<String> {
    use ttf_parser::name::name_id;

    [name_id::POST_SCRIPT_NAME, name_id::FULL_NAME, name_id::FAMILY]
        .iter()
        .find_map(|wanted| {
            face.names()
                .into_iter()
                .filter(|entry| entry.name_id == *wanted)
                .find_map(|entry| entry.to_string())
        })
}

// PDF name token: spaces become dashes, anything else outside [A-Za-z0-9-] is dropped.
fn pdf_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter_map(|ch| match ch {
            ' ' => Some('-'),
            ch if ch.is_ascii_alphanumeric() || ch == '-' => Some(ch),
            _ => None,
        })
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

fn per_mille(value: i32, units_per_em: u16) -> i32 {
    let units = i32::from(units_per_em);
    let scaled = value * 1000;
    if scaled >= 0 {
        (scaled + units / 2) / units
    } else {
        (scaled - units / 2) / units
    }
}

fn advance_per_mille(advance: u16, units_per_em: u16) -> u16 {
    per_mille(i32::from(advance), units_per_em).clamp(0, i32::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_FONTS: [&str; 3] = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    ];

    fn system_font() -> Option<TrueTypeFont> {
        SYSTEM_FONTS
            .iter()
            .find(|path| Path::new(path).is_file())
            .and_then(|path| TrueTypeFont::from_file(path).ok())
    }

    #[test]
    fn helvetica_measures_with_afm_widths() {
        let font = StandardFont::helvetica();
        // "Hi" = 722 + 222 units.
        assert_eq!(font.measure("Hi", Pt::from_i32(10)).milli(), 9440);
        assert_eq!(font.cap_height(Pt::from_i32(10)).milli(), 7180);
        assert_eq!(font.measure("", Pt::from_i32(12)), Pt::ZERO);
        // č is 500 units, ė 556.
        assert_eq!(font.measure("čė", Pt::from_i32(10)).milli(), 10_560);
    }

    #[test]
    fn helvetica_encodes_lithuanian_letters_exactly() {
        let font = StandardFont::helvetica();
        assert_eq!(font.encode_text("Raidė: A"), "(Raid\\211: A)");
        assert_eq!(font.encode_text("Sekančio"), "(Sekan\\204io)");
        assert_eq!(font.encode_text("Taškas"), "(Ta\\232kas)");
        assert_eq!(font.encode_text("ĄąŲųŪū"), "(\\201\\202\\215\\217\\220\\225)");
        for ch in "ĄČĘĖĮŲŪŠŽąčęėįųūšž".chars() {
            assert!(font.supports(ch), "{ch}");
        }
        assert!(!font.supports('ł'));
        assert!(!font.supports('\u{6771}'));
    }

    #[test]
    fn helvetica_escapes_string_delimiters() {
        let font = StandardFont::helvetica();
        assert_eq!(font.encode_text("a(b)\\"), "(a\\(b\\)\\\\)");
    }

    #[test]
    fn helvetica_object_carries_differences() {
        let objects = StandardFont::helvetica().font_objects(7, &BTreeSet::new());
        assert_eq!(objects.len(), 1);
        assert_eq!(
            objects[0],
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding << /Type /Encoding /BaseEncoding /WinAnsiEncoding /Differences [129 /Aogonek /aogonek /Ccaron /ccaron 134 /Eogonek /eogonek /Edotaccent /edotaccent 139 /Iogonek /iogonek /Uogonek 143 /uogonek /Umacron 149 /umacron] >> >>"
        );
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let err = TrueTypeFont::from_bytes(vec![0, 1, 2, 3], Some("broken")).unwrap_err();
        assert!(matches!(err, RouteError::Font(_)));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn missing_font_file_is_io_error() {
        let err = TrueTypeFont::from_file("/nonexistent/routemaker/font.ttf").unwrap_err();
        assert!(matches!(err, RouteError::Io(_)));
    }

    #[test]
    fn cmap_maps_glyphs_to_utf16() {
        let glyphs = BTreeMap::from([(3u16, 'ė'), (17u16, 'A')]);
        let cmap = to_unicode_cmap(&glyphs);
        assert!(cmap.starts_with("/CIDInit"));
        assert!(cmap.contains("2 beginbfchar\n<0003> <0117>\n<0011> <0041>\nendbfchar\n"));
        assert!(cmap.ends_with("end\nend"));
    }

    #[test]
    fn names_and_scaling() {
        assert_eq!(pdf_name("DejaVu Sans"), "DejaVu-Sans");
        assert_eq!(pdf_name("(*)"), "EmbeddedFont");
        assert_eq!(per_mille(1229, 2048), 600);
        assert_eq!(per_mille(-483, 2048), -236);
        assert_eq!(advance_per_mille(1024, 2048), 500);
    }

    #[test]
    fn truetype_font_embeds_identity_h() {
        let Some(font) = system_font() else {
            return;
        };
        assert!(font.supports('ė'));
        let encoded = font.encode_text("Aė");
        assert!(encoded.starts_with('<') && encoded.ends_with('>'));
        assert_eq!(encoded.len(), 2 + 8);

        let used: BTreeSet<char> = "Raidė".chars().collect();
        let objects = font.font_objects(11, &used);
        assert_eq!(objects.len(), 5);
        assert!(objects[0].contains("/Identity-H"));
        assert!(objects[0].contains("/DescendantFonts [12 0 R]"));
        assert!(objects[0].contains("/ToUnicode 15 0 R"));
        assert!(objects[1].contains("/FontDescriptor 13 0 R"));
        assert!(objects[2].contains("/FontFile2 14 0 R"));
        assert!(objects[3].contains("/Length1"));
        assert!(objects[4].contains("<0117>"));
        assert!(font.measure("Raidė", Pt::from_i32(10)) > Pt::ZERO);
    }
}
