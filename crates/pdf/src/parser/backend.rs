use std::collections::BTreeMap;

use lopdf::{self, content::Content, Encoding};

use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// Mirrors `lopdf::ObjectId`: (object number, generation number).
pub type ObjectId = (u32, u16);

/// Object id of a page dictionary.
pub type PageId = ObjectId;

/// The identity 2x3 matrix: [a, b, c, d, e, f].
pub const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Visible area of a page in default user space (y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PageBox {
    /// A4 portrait, used when a page declares no usable box.
    pub const A4: PageBox = PageBox {
        x0: 0.0,
        y0: 0.0,
        x1: 595.28,
        y1: 841.89,
    };

    /// Box spanned by two opposite corners, in any order.
    pub fn from_corners(ax: f32, ay: f32, bx: f32, by: f32) -> Self {
        Self {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Where resource names (`/F1`, `/X1`) are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    /// The page's resources, inherited ones included.
    Page(PageId),
    /// The `/Resources` of a form XObject.
    Form(ObjectId),
}

/// A form XObject ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct FormXObject {
    pub id: ObjectId,
    /// Form space to the user space of the invoking content stream.
    pub matrix: [f32; 6],
    /// Decompressed content stream.
    pub content: Vec<u8>,
    /// Scope for names used inside the form. Forms without their own
    /// `/Resources` use the invoking scope.
    pub scope: ResourceScope,
}

/// Font information extracted from a resource dictionary.
#[derive(Debug, Clone, Default)]
pub struct BackendFontInfo {
    /// The font name key as it appears in the resource dictionary (e.g. `b"F1"`).
    pub name: Vec<u8>,
    /// Base font name from the font dictionary, if present.
    pub base_font: Option<String>,
}

/// How the string operands of one font become text.
#[derive(Debug)]
pub enum TextDecoder<'a> {
    /// An encoding lopdf resolved from the font, `ToUnicode` CMaps included.
    Font(Encoding<'a>),
    /// Predefined Shift_JIS CMaps (`90ms-RKSJ-H` and relatives).
    ShiftJis,
    /// Predefined UCS-2 / UTF-16 CMaps (`UniJIS-UCS2-H`, `UniJIS-UTF16-H`).
    Utf16,
    /// `Identity-H` / `Identity-V` without a `ToUnicode` map.
    Identity,
    /// No usable font encoding.
    Plain,
}

impl TextDecoder<'_> {
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextDecoder::Font(encoding) => lopdf::Document::decode_text(encoding, bytes)
                .unwrap_or_else(|_| decode_text_simple(bytes)),
            TextDecoder::ShiftJis => encoding_rs::SHIFT_JIS
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
            TextDecoder::Utf16 => utf16be(bytes),
            TextDecoder::Identity => {
                // CIDs are not Unicode, but some producers use Unicode values as CIDs.
                if bytes.len() >= 2 && bytes.len() % 2 == 0 {
                    let decoded = utf16be(bytes);
                    if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                        return decoded;
                    }
                }
                decode_text_simple(bytes)
            }
            TextDecoder::Plain => decode_text_simple(bytes),
        }
    }
}

/// A simplified, lopdf-independent representation of a PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(ObjectId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Convert a `lopdf::Object` into a [`PdfValue`]. Stream bodies are dropped.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(
            dict.iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Stream(stream) => PdfValue::Dict(
            stream
                .dict
                .iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

fn utf16be(bytes: &[u8]) -> String {
    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&code_units)
}

/// Best-effort decoding of raw PDF string bytes.
///
/// UTF-16BE with a BOM, then UTF-8, then Latin-1 byte by byte.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return utf16be(payload);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over a PDF parsing backend (currently backed by `lopdf`).
///
/// Span extraction only talks to this trait, so it can be tested against
/// hand-built content streams.
pub trait PdfBackend {
    /// Return a mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Visible page area: the CropBox, else the MediaBox, else A4.
    fn page_box(&self, page: PageId) -> Result<PageBox, PdfError>;

    /// Every font reachable from `scope`.
    fn fonts(&self, scope: ResourceScope) -> Result<Vec<BackendFontInfo>, PdfError>;

    /// Return the raw (possibly compressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Decode raw content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Resolve the XObject `name` in `scope`. `Ok(None)` for anything that is
    /// not a form (images, unknown names).
    fn form_xobject(&self, scope: ResourceScope, name: &[u8]) -> Result<Option<FormXObject>, PdfError>;

    /// Decoder for strings shown with the font `font_name` of `scope`.
    fn text_decoder(&self, scope: ResourceScope, font_name: &[u8]) -> TextDecoder<'_>;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] implementation backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    // -- private helpers ----------------------------------------------------

    /// Walk up the page tree to find an inheritable box (`CropBox`, `MediaBox`).
    fn find_box(&self, dict: &lopdf::Dictionary, key: &[u8]) -> Option<Vec<lopdf::Object>> {
        if let Some(arr) = dict.get(key).ok().and_then(|obj| self.resolve_array(obj)) {
            return Some(arr);
        }

        let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent = self.doc.get_object(parent_id).ok()?.as_dict().ok()?;
        self.find_box(parent, key)
    }

    /// Resolve an object to an array, following a single level of indirection.
    fn resolve_array(&self, obj: &lopdf::Object) -> Option<Vec<lopdf::Object>> {
        match obj {
            lopdf::Object::Array(arr) => Some(arr.clone()),
            lopdf::Object::Reference(id) => self
                .doc
                .get_object(*id)
                .ok()
                .and_then(|resolved| resolved.as_array().ok())
                .cloned(),
            _ => None,
        }
    }

    /// Convert a vector of lopdf objects to `f32` values.
    fn array_to_f32s(&self, objects: &[lopdf::Object]) -> Result<Vec<f32>, PdfError> {
        objects
            .iter()
            .map(|obj| {
                let resolved = match obj {
                    lopdf::Object::Reference(id) => self
                        .doc
                        .get_object(*id)
                        .map_err(|e| PdfError::Parse(e.to_string()))?,
                    other => other,
                };
                resolved.as_float().map_err(|_| {
                    PdfError::Parse(format!("expected number in array, got {:?}", resolved))
                })
            })
            .collect()
    }

    /// Resource dictionaries of `scope`, innermost first.
    fn resource_dicts(&self, scope: ResourceScope) -> Vec<&lopdf::Dictionary> {
        match scope {
            ResourceScope::Page(page) => {
                let Ok((direct, inherited)) = self.doc.get_page_resources(page) else {
                    return Vec::new();
                };
                direct
                    .into_iter()
                    .chain(inherited.into_iter().filter_map(|id| self.doc.get_dictionary(id).ok()))
                    .collect()
            }
            ResourceScope::Form(id) => self
                .doc
                .get_object(id)
                .and_then(lopdf::Object::as_stream)
                .and_then(|stream| stream.dict.get_deref(b"Resources", &self.doc))
                .and_then(lopdf::Object::as_dict)
                .map(|dict| vec![dict])
                .unwrap_or_default(),
        }
    }

    /// Entries of one resource category (`Font`, `XObject`) with references
    /// resolved. The first definition of a name wins.
    fn named_resources(
        &self,
        scope: ResourceScope,
        category: &[u8],
    ) -> BTreeMap<Vec<u8>, (Option<ObjectId>, &lopdf::Object)> {
        let mut named = BTreeMap::new();
        for resources in self.resource_dicts(scope) {
            let Ok(entries) = self.doc.get_dict_in_dict(resources, category) else {
                continue;
            };
            for (name, value) in entries.iter() {
                if named.contains_key(name) {
                    continue;
                }
                if let Ok(resolved) = self.doc.dereference(value) {
                    named.insert(name.clone(), resolved);
                }
            }
        }
        named
    }

    fn font_dict(&self, scope: ResourceScope, font_name: &[u8]) -> Option<&lopdf::Dictionary> {
        let (_, obj) = *self.named_resources(scope, b"Font").get(font_name)?;
        obj.as_dict().ok()
    }
}

// ---------------------------------------------------------------------------
// PdfBackend implementation for LopdfBackend
// ---------------------------------------------------------------------------

fn name_of(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_box(&self, page: PageId) -> Result<PageBox, PdfError> {
        let page_dict = self
            .doc
            .get_object(page)
            .and_then(|obj| obj.as_dict())
            .map_err(|e| PdfError::Parse(format!("cannot get page dictionary: {}", e)))?;

        let Some(area) = self
            .find_box(page_dict, b"CropBox")
            .or_else(|| self.find_box(page_dict, b"MediaBox"))
        else {
            return Ok(PageBox::A4);
        };

        let nums = self.array_to_f32s(&area)?;
        if nums.len() < 4 {
            return Err(PdfError::Parse(format!(
                "page box has {} elements, expected 4",
                nums.len()
            )));
        }

        Ok(PageBox::from_corners(nums[0], nums[1], nums[2], nums[3]))
    }

    fn fonts(&self, scope: ResourceScope) -> Result<Vec<BackendFontInfo>, PdfError> {
        Ok(self
            .named_resources(scope, b"Font")
            .into_iter()
            .filter_map(|(name, (_, obj))| {
                let dict = obj.as_dict().ok()?;
                Some(BackendFontInfo {
                    name,
                    base_font: name_of(dict, b"BaseFont"),
                })
            })
            .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn form_xobject(&self, scope: ResourceScope, name: &[u8]) -> Result<Option<FormXObject>, PdfError> {
        let xobjects = self.named_resources(scope, b"XObject");
        let Some(&(Some(id), obj)) = xobjects.get(name) else {
            return Ok(None);
        };
        let Ok(stream) = obj.as_stream() else {
            return Ok(None);
        };
        if name_of(&stream.dict, b"Subtype").as_deref() != Some("Form") {
            return Ok(None);
        }

        let matrix = match stream.dict.get(b"Matrix").ok().and_then(|m| self.resolve_array(m)) {
            Some(values) => {
                let nums = self.array_to_f32s(&values)?;
                <[f32; 6]>::try_from(nums.as_slice()).unwrap_or(IDENTITY_MATRIX)
            }
            None => IDENTITY_MATRIX,
        };
        let content = stream
            .get_plain_content()
            .map_err(|e| PdfError::Parse(format!("cannot get form content: {}", e)))?;
        let scope = if stream.dict.has(b"Resources") {
            ResourceScope::Form(id)
        } else {
            scope
        };

        Ok(Some(FormXObject {
            id,
            matrix,
            content,
            scope,
        }))
    }

    fn text_decoder(&self, scope: ResourceScope, font_name: &[u8]) -> TextDecoder<'_> {
        let Some(font) = self.font_dict(scope, font_name) else {
            return TextDecoder::Plain;
        };
        let encoding_name = name_of(font, b"Encoding").unwrap_or_default();

        match font.get_font_encoding(&self.doc) {
            Ok(Encoding::SimpleEncoding(name)) => {
                let name = String::from_utf8_lossy(name);
                if name.contains("RKSJ") {
                    TextDecoder::ShiftJis
                } else if name.contains("UCS2") || name.contains("UTF16") {
                    TextDecoder::Utf16
                } else {
                    TextDecoder::Plain
                }
            }
            Ok(encoding) => TextDecoder::Font(encoding),
            Err(_) if encoding_name.starts_with("Identity") => TextDecoder::Identity,
            Err(_) => TextDecoder::Plain,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use lopdf::{dictionary, Object, Stream};

    use super::*;

    /// `/CIDInit` boilerplate around a ToUnicode body.
    fn to_unicode_cmap(body: &str) -> Vec<u8> {
        format!(
            "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo
<< /Registry (Adobe)
/Ordering (UCS)
/Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
{body}
endcmap
CMapName currentdict /CMap defineresource pop
end
end"
        )
        .into_bytes()
    }

    /// One-page document: `font` as `/F1`, `xobjects` on the page resources,
    /// `content` as the page content stream.
    pub(crate) fn build_document(
        font: lopdf::Dictionary,
        xobjects: Vec<(&str, ObjectId)>,
        page_extra: lopdf::Dictionary,
        content: &[u8],
        setup: impl FnOnce(&mut lopdf::Document, ObjectId, ObjectId),
    ) -> LopdfBackend {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(font);

        let mut xobject_dict = lopdf::Dictionary::new();
        for (name, id) in xobjects {
            xobject_dict.set(name, id);
        }
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobject_dict,
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        for (key, value) in page_extra.iter() {
            page.set(key.clone(), value.clone());
        }
        let page_id = doc.add_object(page);

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        setup(&mut doc, page_id, font_id);
        LopdfBackend { doc }
    }

    pub(crate) fn helvetica() -> lopdf::Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        }
    }

    fn first_page(backend: &LopdfBackend) -> PageId {
        *backend.pages().values().next().unwrap()
    }

    #[test]
    fn decode_text_simple_utf8() {
        assert_eq!(decode_text_simple("白書 2017".as_bytes()), "白書 2017");
    }

    #[test]
    fn decode_text_simple_latin1() {
        let input: &[u8] = &[0x63, 0x61, 0x66, 0xE9];
        assert_eq!(decode_text_simple(input), "caf\u{00E9}");
    }

    #[test]
    fn decode_text_simple_utf16be_with_bom() {
        // U+767D U+66F8
        let input: &[u8] = &[0xFE, 0xFF, 0x76, 0x7D, 0x66, 0xF8];
        assert_eq!(decode_text_simple(input), "白書");
    }

    #[test]
    fn decode_text_simple_utf16be_odd_trailing_byte() {
        let input: &[u8] = &[0xFE, 0xFF, 0x00, 0x41, 0x00];
        assert_eq!(decode_text_simple(input), "A");
    }

    #[test]
    fn decode_text_simple_empty() {
        assert_eq!(decode_text_simple(&[]), "");
    }

    #[test]
    fn get_number_accepts_integers_and_reals() {
        assert_eq!(get_number_from_value(&PdfValue::Integer(-10)), Some(-10.0));
        assert_eq!(get_number_from_value(&PdfValue::Real(2.5)), Some(2.5));
        assert_eq!(get_number_from_value(&PdfValue::Null), None);
        assert_eq!(get_number_from_value(&PdfValue::Str(b"1".to_vec())), None);
    }

    #[test]
    fn convert_nested_array_in_dict() {
        let mut dict = lopdf::Dictionary::new();
        dict.set(
            "MediaBox",
            lopdf::Object::Array(vec![
                lopdf::Object::Integer(0),
                lopdf::Object::Integer(0),
                lopdf::Object::Real(595.0),
                lopdf::Object::Real(842.0),
            ]),
        );

        match convert_object(&lopdf::Object::Dictionary(dict)) {
            PdfValue::Dict(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0, b"MediaBox");
                assert_eq!(
                    entries[0].1,
                    PdfValue::Array(vec![
                        PdfValue::Integer(0),
                        PdfValue::Integer(0),
                        PdfValue::Real(595.0),
                        PdfValue::Real(842.0),
                    ]),
                );
            }
            other => panic!("expected Dict, got {:?}", other),
        }
    }

    #[test]
    fn convert_string_and_reference() {
        assert_eq!(
            convert_object(&lopdf::Object::String(
                b"abc".to_vec(),
                lopdf::StringFormat::Literal,
            )),
            PdfValue::Str(b"abc".to_vec()),
        );
        assert_eq!(
            convert_object(&lopdf::Object::Reference((7, 0))),
            PdfValue::Reference((7, 0))
        );
    }

    #[test]
    fn load_bytes_rejects_garbage() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn to_unicode_with_mixed_code_lengths() {
        let cmap = to_unicode_cmap(
            "2 begincodespacerange
<00> <80>
<8140> <9FFC>
endcodespacerange
2 beginbfchar
<41> <0041>
<889F> <4E9C>
endbfchar",
        );
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "MS-Mincho",
            "Encoding" => "Identity-H",
        };
        let backend = build_document(font, vec![], dictionary! {}, b"", |doc, _, font_id| {
            let cmap_id = doc.add_object(Stream::new(dictionary! {}, cmap));
            if let Ok(font) = doc.get_dictionary_mut(font_id) {
                font.set("ToUnicode", cmap_id);
            }
        });

        let scope = ResourceScope::Page(first_page(&backend));
        let decoder = backend.text_decoder(scope, b"F1");
        assert!(matches!(decoder, TextDecoder::Font(_)));
        assert_eq!(decoder.decode(&[0x41, 0x88, 0x9F, 0x41]), "A亜A");
    }

    #[test]
    fn identity_font_without_to_unicode_falls_back_to_utf16() {
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "HeiseiMin-W3",
            "Encoding" => "Identity-H",
        };
        let backend = build_document(font, vec![], dictionary! {}, b"", |_, _, _| {});
        let decoder = backend.text_decoder(ResourceScope::Page(first_page(&backend)), b"F1");
        assert!(matches!(decoder, TextDecoder::Identity));
        assert_eq!(decoder.decode(&[0x76, 0x7D, 0x66, 0xF8]), "白書");
    }

    #[test]
    fn shift_jis_cmap_font() {
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Ryumin-Light",
            "Encoding" => "90ms-RKSJ-H",
        };
        let backend = build_document(font, vec![], dictionary! {}, b"", |_, _, _| {});
        let decoder = backend.text_decoder(ResourceScope::Page(first_page(&backend)), b"F1");
        // "A白書" in Shift_JIS.
        assert_eq!(decoder.decode(&[0x41, 0x94, 0x92, 0x8F, 0x91]), "A白書");
    }

    #[test]
    fn win_ansi_font_and_unknown_font() {
        let backend = build_document(helvetica(), vec![], dictionary! {}, b"", |_, _, _| {});
        let scope = ResourceScope::Page(first_page(&backend));
        assert_eq!(backend.text_decoder(scope, b"F1").decode(b"caf\xE9"), "caf\u{e9}");
        assert!(matches!(backend.text_decoder(scope, b"F9"), TextDecoder::Plain));
    }

    #[test]
    fn fonts_of_page_scope() {
        let backend = build_document(helvetica(), vec![], dictionary! {}, b"", |_, _, _| {});
        let fonts = backend.fonts(ResourceScope::Page(first_page(&backend))).unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].name, b"F1");
        assert_eq!(fonts[0].base_font.as_deref(), Some("Helvetica"));
    }

    #[test]
    fn page_box_prefers_crop_box() {
        let backend = build_document(
            helvetica(),
            vec![],
            dictionary! {
                "MediaBox" => vec![(-20).into(), (-10).into(), 600.into(), 850.into()],
                "CropBox" => vec![10.into(), 20.into(), 310.into(), 420.into()],
            },
            b"",
            |_, _, _| {},
        );
        let area = backend.page_box(first_page(&backend)).unwrap();
        assert_eq!(area, PageBox::from_corners(10.0, 20.0, 310.0, 420.0));
        assert_eq!(area.width(), 300.0);
        assert_eq!(area.height(), 400.0);
    }

    #[test]
    fn page_box_inherits_media_box() {
        let backend = build_document(helvetica(), vec![], dictionary! {}, b"", |_, _, _| {});
        let area = backend.page_box(first_page(&backend)).unwrap();
        assert_eq!(area, PageBox::from_corners(0.0, 0.0, 595.0, 842.0));
    }

    #[test]
    fn page_box_normalizes_corner_order() {
        let area = PageBox::from_corners(600.0, 800.0, 100.0, 0.0);
        assert_eq!((area.x0, area.y0, area.x1, area.y1), (100.0, 0.0, 600.0, 800.0));
    }

    #[test]
    fn form_xobject_lookup() {
        let backend = build_document(helvetica(), vec![], dictionary! {}, b"", |doc, page_id, _| {
            let form_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                    "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 10.into(), 20.into()],
                },
                b"BT /F1 12 Tf (x) Tj ET".to_vec(),
            ));
            let image_id = doc.add_object(Stream::new(
                dictionary! { "Type" => "XObject", "Subtype" => "Image" },
                vec![0],
            ));
            if let Ok(page) = doc.get_dictionary_mut(page_id) {
                page.set(
                    "Resources",
                    dictionary! {
                        "XObject" => dictionary! { "X1" => form_id, "Im1" => image_id },
                    },
                );
            }
        });
        let page = first_page(&backend);
        let scope = ResourceScope::Page(page);

        let form = backend.form_xobject(scope, b"X1").unwrap().unwrap();
        assert_eq!(form.matrix, [1.0, 0.0, 0.0, 1.0, 10.0, 20.0]);
        assert_eq!(form.content, b"BT /F1 12 Tf (x) Tj ET");
        // No /Resources of its own: names resolve in the page scope.
        assert_eq!(form.scope, scope);

        assert!(backend.form_xobject(scope, b"Im1").unwrap().is_none());
        assert!(backend.form_xobject(scope, b"Missing").unwrap().is_none());
    }
}
