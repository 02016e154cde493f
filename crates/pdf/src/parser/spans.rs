//! Content-stream walking: PDF text operators to positioned [`TextSpan`]s.
//!
//! Positions are in default user space (points, y axis pointing up), with the
//! text matrix and the current transformation matrix both applied. Form
//! XObjects drawn with `Do` are walked in place.

use std::collections::HashMap;

use super::backend::{
    get_number_from_value, BackendFontInfo, ContentOp, ObjectId, PageBox, PageId, PdfBackend,
    PdfValue, ResourceScope, TextDecoder, IDENTITY_MATRIX,
};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single run of text at a specific position on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// Left edge of the run.
    pub x: f32,
    /// Baseline.
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Advance of a half-width glyph as a fraction of the font size. No glyph
/// metrics are read, so widths are estimates.
const HALF_WIDTH_RATIO: f32 = 0.5;

/// Advance of a full-width (CJK) glyph as a fraction of the font size.
const FULL_WIDTH_RATIO: f32 = 1.0;

/// Nesting limit for form XObjects drawn inside form XObjects.
const MAX_FORM_DEPTH: usize = 8;

// ---------------------------------------------------------------------------
// CJK / spaceless-script helper
// ---------------------------------------------------------------------------

/// Returns `true` if `c` belongs to a script that does not use inter-word
/// spaces and is set full-width (CJK ideographs, kana, Hangul, CJK
/// punctuation and full-width forms).
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF
            | 0x3400..=0x4DBF
            | 0x20000..=0x2A6DF
            | 0xF900..=0xFAFF
            | 0x3040..=0x309F
            | 0x30A0..=0x30FF
            | 0x31F0..=0x31FF
            | 0xAC00..=0xD7AF
            | 0x1100..=0x11FF
            | 0x3130..=0x318F
            | 0x3000..=0x303F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
    )
}

fn char_width_ratio(c: char) -> f32 {
    if is_spaceless_script_char(c) {
        FULL_WIDTH_RATIO
    } else {
        HALF_WIDTH_RATIO
    }
}

/// `m1 x m2` for PDF's row-vector matrices.
fn multiply(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn matrix_from(operands: &[PdfValue]) -> Option<[f32; 6]> {
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    <[f32; 6]>::try_from(vals.as_slice()).ok()
}

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    /// Resource key of the current font (`F1`).
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    /// Current transformation matrix.
    ctm: [f32; 6],
    /// Saved by `q`, restored by `Q`.
    ctm_stack: Vec<[f32; 6]>,
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            ctm: IDENTITY_MATRIX,
            ctm_stack: Vec::new(),
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Text space to user space.
    fn rendering_matrix(&self) -> [f32; 6] {
        multiply(&self.text_matrix, &self.ctm)
    }

    /// Current pen position in user space, text rise included.
    fn position(&self) -> (f32, f32) {
        let m = self.rendering_matrix();
        let x = m[2] * self.text_rise + m[4];
        let y = m[3] * self.text_rise + m[5];
        (x, y)
    }

    /// Vertical scale of the rendering matrix.
    fn vertical_scale(&self) -> f32 {
        let m = self.rendering_matrix();
        (m[2].powi(2) + m[3].powi(2)).sqrt()
    }

    /// Horizontal scale of the rendering matrix.
    fn horizontal_scale(&self) -> f32 {
        let m = self.rendering_matrix();
        (m[0].powi(2) + m[1].powi(2)).sqrt()
    }

    fn effective_font_size(&self) -> f32 {
        (self.font_size * self.vertical_scale()).abs()
    }

    /// Advance the text matrix horizontally by `dx` text-space units.
    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the text line matrix by a translation (Td / TD / T*).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    /// Unscaled text-space advance of `text`.
    fn text_advance(&self, text: &str) -> f32 {
        text.chars()
            .map(|ch| {
                let mut dx = self.font_size * char_width_ratio(ch) + self.char_spacing;
                if ch == ' ' {
                    dx += self.word_spacing;
                }
                dx * self.horiz_scale
            })
            .sum()
    }

    /// Width of `text` in user space.
    fn rendered_width(&self, text: &str) -> f32 {
        (self.text_advance(text) * self.horizontal_scale()).abs()
    }

    fn advance_after_show(&mut self, text: &str) {
        let dx = self.text_advance(text);
        self.advance_x(dx);
    }
}

// ---------------------------------------------------------------------------
// Internal: fonts of one resource scope
// ---------------------------------------------------------------------------

/// Fonts of one resource scope. Decoders are built on first use.
struct ScopeFonts<'b> {
    scope: ResourceScope,
    fonts: Vec<BackendFontInfo>,
    decoders: HashMap<Vec<u8>, TextDecoder<'b>>,
}

impl<'b> ScopeFonts<'b> {
    fn load(backend: &'b dyn PdfBackend, scope: ResourceScope) -> Self {
        let fonts = backend.fonts(scope).unwrap_or_else(|err| {
            log::warn!("cannot list fonts of {scope:?}: {err}");
            Vec::new()
        });
        Self {
            scope,
            fonts,
            decoders: HashMap::new(),
        }
    }

    fn base_font(&self, key: &[u8]) -> Option<String> {
        self.fonts
            .iter()
            .find(|info| info.name == key)
            .and_then(|info| info.base_font.clone())
    }

    fn decode(&mut self, backend: &'b dyn PdfBackend, key: &[u8], bytes: &[u8]) -> String {
        let scope = self.scope;
        self.decoders
            .entry(key.to_vec())
            .or_insert_with(|| backend.text_decoder(scope, key))
            .decode(bytes)
    }
}

// ---------------------------------------------------------------------------
// Internal: content-stream walker
// ---------------------------------------------------------------------------

struct SpanWalker<'b> {
    backend: &'b dyn PdfBackend,
    spans: Vec<TextSpan>,
    /// Forms being drawn, outermost first.
    active_forms: Vec<ObjectId>,
}

impl<'b> SpanWalker<'b> {
    fn new(backend: &'b dyn PdfBackend) -> Self {
        Self {
            backend,
            spans: Vec::new(),
            active_forms: Vec::new(),
        }
    }

    fn walk(&mut self, ops: &[ContentOp], scope: ResourceScope, state: &mut TextState) {
        let mut fonts = ScopeFonts::load(self.backend, scope);

        for op in ops {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                // -- Graphics state -------------------------------------
                "q" => state.ctm_stack.push(state.ctm),
                "Q" => {
                    if let Some(ctm) = state.ctm_stack.pop() {
                        state.ctm = ctm;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_from(operands) {
                        state.ctm = multiply(&m, &state.ctm);
                    }
                }
                "Do" => {
                    if let Some(PdfValue::Name(name)) = operands.first() {
                        self.draw_form(name, scope, state);
                    }
                }

                // -- Text object ----------------------------------------
                "BT" => {
                    state.text_matrix = IDENTITY_MATRIX;
                    state.line_matrix = IDENTITY_MATRIX;
                }
                "Tf" => handle_tf(operands, &fonts, state),
                "Tm" => {
                    if let Some(m) = matrix_from(operands) {
                        state.text_matrix = m;
                        state.line_matrix = m;
                    }
                }
                "Td" | "TD" => {
                    if operands.len() >= 2 {
                        let tx = get_number_from_value(&operands[0]).unwrap_or(0.0);
                        let ty = get_number_from_value(&operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            state.leading = -ty;
                        }
                        state.translate_line(tx, ty);
                    }
                }
                "T*" => state.translate_line(0.0, -state.leading),
                "TL" | "Tc" | "Tw" | "Tz" | "Ts" => {
                    if let Some(v) = operands.first().and_then(get_number_from_value) {
                        match op.operator.as_str() {
                            "TL" => state.leading = v,
                            "Tc" => state.char_spacing = v,
                            "Tw" => state.word_spacing = v,
                            "Tz" => state.horiz_scale = v / 100.0,
                            _ => state.text_rise = v,
                        }
                    }
                }

                // -- Show text ------------------------------------------
                "Tj" => {
                    if let Some(PdfValue::Str(bytes)) = operands.first() {
                        self.show_string(bytes, &mut fonts, state);
                    }
                }
                "TJ" => {
                    if let Some(PdfValue::Array(arr)) = operands.first() {
                        self.show_array(arr, &mut fonts, state);
                    }
                }
                "'" => {
                    state.translate_line(0.0, -state.leading);
                    if let Some(PdfValue::Str(bytes)) = operands.first() {
                        self.show_string(bytes, &mut fonts, state);
                    }
                }
                "\"" => {
                    if operands.len() >= 3 {
                        if let Some(aw) = get_number_from_value(&operands[0]) {
                            state.word_spacing = aw;
                        }
                        if let Some(ac) = get_number_from_value(&operands[1]) {
                            state.char_spacing = ac;
                        }
                        state.translate_line(0.0, -state.leading);
                        if let PdfValue::Str(bytes) = &operands[2] {
                            self.show_string(bytes, &mut fonts, state);
                        }
                    }
                }

                _ => {}
            }
        }
    }

    /// `Do` on a form XObject: walk its content with the form matrix applied
    /// and the graphics state of the caller restored afterwards.
    fn draw_form(&mut self, name: &[u8], scope: ResourceScope, state: &TextState) {
        let label = String::from_utf8_lossy(name);
        let form = match self.backend.form_xobject(scope, name) {
            Ok(Some(form)) => form,
            Ok(None) => return,
            Err(err) => {
                log::warn!("skipping XObject /{label}: {err}");
                return;
            }
        };

        if self.active_forms.contains(&form.id) {
            log::warn!("skipping XObject /{label}: it draws itself");
            return;
        }
        if self.active_forms.len() >= MAX_FORM_DEPTH {
            log::warn!("skipping XObject /{label}: nested deeper than {MAX_FORM_DEPTH} forms");
            return;
        }

        let ops = match self.backend.decode_content(&form.content) {
            Ok(ops) => ops,
            Err(err) => {
                log::warn!("skipping XObject /{label}: {err}");
                return;
            }
        };

        let mut inner = state.clone();
        inner.ctm = multiply(&form.matrix, &state.ctm);
        inner.ctm_stack.clear();

        self.active_forms.push(form.id);
        self.walk(&ops, form.scope, &mut inner);
        self.active_forms.pop();
    }

    /// Shared by `Tj`, `'` and `"`.
    fn show_string(&mut self, bytes: &[u8], fonts: &mut ScopeFonts<'b>, state: &mut TextState) {
        let text = fonts.decode(self.backend, &state.font_key, bytes);
        if text.is_empty() {
            return;
        }
        let origin = state.position();
        push_span(text.clone(), origin, state, &mut self.spans);
        state.advance_after_show(&text);
    }

    /// Process a `TJ` array: strings to render and numeric kerning
    /// adjustments (thousandths of a text-space unit). Large negative
    /// adjustments read as word gaps and become a space.
    fn show_array(&mut self, arr: &[PdfValue], fonts: &mut ScopeFonts<'b>, state: &mut TextState) {
        let mut buf = String::new();
        let mut origin = state.position();
        let mut advance = 0.0f32;

        for elem in arr {
            match elem {
                PdfValue::Str(bytes) => {
                    let fragment = fonts.decode(self.backend, &state.font_key, bytes);
                    if buf.is_empty() {
                        origin = state.position();
                    }
                    buf.push_str(&fragment);
                    advance += state.text_advance(&fragment);
                    state.advance_after_show(&fragment);
                }
                val => {
                    if let Some(adj) = get_number_from_value(val) {
                        let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;
                        let gap_threshold =
                            state.font_size * HALF_WIDTH_RATIO * state.horiz_scale * 0.3;
                        let after_spaceless =
                            buf.chars().next_back().is_some_and(is_spaceless_script_char);

                        if dx > gap_threshold && !buf.is_empty() && !after_spaceless {
                            buf.push(' ');
                        }
                        if !buf.is_empty() {
                            advance += dx;
                        }
                        state.advance_x(dx);
                    }
                }
            }
        }

        let text = buf.trim_end();
        if text.is_empty() {
            return;
        }

        push_span(text.to_string(), origin, state, &mut self.spans);
        // Pen travel, kerning included, is a better width than the glyph estimate.
        if let Some(last) = self.spans.last_mut() {
            if advance > 0.0 {
                last.width = advance * state.horizontal_scale();
            }
        }
    }
}

fn handle_tf(operands: &[PdfValue], fonts: &ScopeFonts<'_>, state: &mut TextState) {
    if operands.len() < 2 {
        return;
    }
    let key = match &operands[0] {
        PdfValue::Name(n) => n.clone(),
        PdfValue::Str(s) => s.clone(),
        _ => return,
    };

    state.font_size = get_number_from_value(&operands[1]).unwrap_or(0.0);
    state.font_name = fonts
        .base_font(&key)
        .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
    state.font_key = key;
}

fn push_span(text: String, origin: (f32, f32), state: &TextState, spans: &mut Vec<TextSpan>) {
    let width = state.rendered_width(&text);
    spans.push(TextSpan {
        text,
        x: origin.0,
        y: origin.1,
        width,
        font_size: state.effective_font_size(),
        font_name: state.font_name.clone(),
    });
}

// ---------------------------------------------------------------------------
// Public API: span extraction
// ---------------------------------------------------------------------------

/// Walk a single page's content stream and produce a flat list of
/// [`TextSpan`]s.
///
/// | Operator | Action |
/// |----------|--------|
/// | `q` / `Q` | Save / restore the transformation matrix |
/// | `cm`     | Concatenate to the transformation matrix |
/// | `Do`     | Draw a form XObject |
/// | `BT`     | Begin text object, reset text matrices |
/// | `Tf`     | Set font and size |
/// | `Tm`     | Set text matrix |
/// | `Td` / `TD` / `T*` | Move to the next line |
/// | `TL` `Tc` `Tw` `Tz` `Ts` | Text state parameters |
/// | `Tj` / `TJ` / `'` / `"` | Show text |
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextSpan>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;

    let mut walker = SpanWalker::new(backend);
    walker.walk(&ops, ResourceScope::Page(page_id), &mut TextState::default());
    Ok(walker.spans)
}

// ---------------------------------------------------------------------------
// Public API: multi-page extraction
// ---------------------------------------------------------------------------

/// Spans of every page, with the visible page area, keyed by 1-based page
/// number.
///
/// A page whose content cannot be read is logged and comes back without
/// spans.
pub fn extract_all_pages(backend: &dyn PdfBackend) -> Vec<(u32, PageBox, Vec<TextSpan>)> {
    let page_map = backend.pages();
    let mut result = Vec::with_capacity(page_map.len());

    for (&page_num, &page_id) in &page_map {
        let area = backend.page_box(page_id).unwrap_or_else(|err| {
            log::warn!("page {page_num}: {err}; assuming A4");
            PageBox::A4
        });
        let spans = extract_page_spans(backend, page_id).unwrap_or_else(|err| {
            log::warn!("page {page_num}: {err}; text skipped");
            Vec::new()
        });
        result.push((page_num, area, spans));
    }

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use lopdf::{dictionary, Stream};

    use super::super::backend::tests::{build_document, helvetica};
    use super::super::backend::{decode_text_simple, FormXObject};
    use super::*;

    pub(crate) struct MockBackend {
        pub page_ids: BTreeMap<u32, PageId>,
        pub area: PageBox,
        pub fonts: Vec<BackendFontInfo>,
        /// Page content, stored pre-decoded.
        pub ops: Vec<ContentOp>,
        /// Form XObjects by resource name. A form's `content` is its name,
        /// which `decode_content` maps to the ops stored here.
        pub forms: BTreeMap<Vec<u8>, (FormXObject, Vec<ContentOp>)>,
        /// Pages whose content cannot be read.
        pub unreadable: Vec<PageId>,
    }

    impl MockBackend {
        pub fn single_page(fonts: Vec<BackendFontInfo>, ops: Vec<ContentOp>) -> Self {
            Self {
                page_ids: BTreeMap::from([(1, (1, 0))]),
                area: PageBox::from_corners(0.0, 0.0, 595.0, 842.0),
                fonts,
                ops,
                forms: BTreeMap::new(),
                unreadable: Vec::new(),
            }
        }

        pub fn add_form(&mut self, name: &[u8], id: ObjectId, matrix: [f32; 6], ops: Vec<ContentOp>) {
            let form = FormXObject {
                id,
                matrix,
                content: name.to_vec(),
                scope: ResourceScope::Page((1, 0)),
            };
            self.forms.insert(name.to_vec(), (form, ops));
        }
    }

    impl PdfBackend for MockBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            self.page_ids.clone()
        }

        fn page_box(&self, _page: PageId) -> Result<PageBox, PdfError> {
            Ok(self.area)
        }

        fn fonts(&self, _scope: ResourceScope) -> Result<Vec<BackendFontInfo>, PdfError> {
            Ok(self.fonts.clone())
        }

        fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
            if self.unreadable.contains(&page) {
                return Err(PdfError::Parse("content stream decode error".to_string()));
            }
            Ok(vec![])
        }

        fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
            if data.is_empty() {
                return Ok(self.ops.clone());
            }
            Ok(self
                .forms
                .get(data)
                .map(|(_, ops)| ops.clone())
                .unwrap_or_default())
        }

        fn form_xobject(&self, _scope: ResourceScope, name: &[u8]) -> Result<Option<FormXObject>, PdfError> {
            Ok(self.forms.get(name).map(|(form, _)| form.clone()))
        }

        fn text_decoder(&self, _scope: ResourceScope, _font_name: &[u8]) -> TextDecoder<'_> {
            TextDecoder::Plain
        }
    }

    pub(crate) fn make_op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp {
            operator: operator.to_string(),
            operands,
        }
    }

    pub(crate) fn mincho_font() -> Vec<BackendFontInfo> {
        vec![BackendFontInfo {
            name: b"F1".to_vec(),
            base_font: Some("MS-Mincho".to_string()),
        }]
    }

    pub(crate) fn tf_op(font: &[u8], size: f32) -> ContentOp {
        make_op(
            "Tf",
            vec![PdfValue::Name(font.to_vec()), PdfValue::Real(size)],
        )
    }

    pub(crate) fn tm_op(x: f32, y: f32) -> ContentOp {
        make_op(
            "Tm",
            [1.0, 0.0, 0.0, 1.0, x, y]
                .into_iter()
                .map(PdfValue::Real)
                .collect(),
        )
    }

    pub(crate) fn tj_op(text: &str) -> ContentOp {
        make_op("Tj", vec![PdfValue::Str(text.as_bytes().to_vec())])
    }

    pub(crate) fn do_op(name: &[u8]) -> ContentOp {
        make_op("Do", vec![PdfValue::Name(name.to_vec())])
    }

    /// `BT /F1 size Tf x y Tm (text) Tj ET`
    pub(crate) fn text_at(x: f32, y: f32, size: f32, text: &str) -> Vec<ContentOp> {
        vec![
            make_op("BT", vec![]),
            tf_op(b"F1", size),
            tm_op(x, y),
            tj_op(text),
            make_op("ET", vec![]),
        ]
    }

    #[test]
    fn test_extract_simple_text() {
        let backend = MockBackend::single_page(mincho_font(), text_at(72.0, 700.0, 10.5, "科学技術"));

        let spans = extract_page_spans(&backend, (1, 0)).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "科学技術");
        assert!((spans[0].x - 72.0).abs() < 0.01);
        assert!((spans[0].y - 700.0).abs() < 0.01);
        assert!((spans[0].font_size - 10.5).abs() < 0.01);
        assert_eq!(spans[0].font_name, "MS-Mincho");
        // Four full-width glyphs.
        assert!((spans[0].width - 42.0).abs() < 0.01);
    }

    #[test]
    fn test_td_moves_to_next_line() {
        let ops = vec![
            make_op("BT", vec![]),
            tf_op(b"F1", 10.0),
            make_op("Td", vec![PdfValue::Integer(50), PdfValue::Integer(600)]),
            tj_op("一行目"),
            make_op("TD", vec![PdfValue::Integer(0), PdfValue::Integer(-14)]),
            tj_op("二行目"),
            make_op("T*", vec![]),
            tj_op("三行目"),
            make_op("ET", vec![]),
        ];
        let backend = MockBackend::single_page(mincho_font(), ops);

        let spans = extract_page_spans(&backend, (1, 0)).unwrap();
        let ys: Vec<f32> = spans.iter().map(|s| s.y).collect();
        assert_eq!(ys, vec![600.0, 586.0, 572.0]);
        assert!(spans.iter().all(|s| (s.x - 50.0).abs() < 0.01));
    }

    #[test]
    fn test_cm_scales_and_translates() {
        let mut ops = vec![
            make_op("q", vec![]),
            make_op(
                "cm",
                [2.0, 0.0, 0.0, 2.0, 10.0, 20.0]
                    .into_iter()
                    .map(PdfValue::Real)
                    .collect(),
            ),
        ];
        ops.extend(text_at(5.0, 100.0, 10.0, "白書"));
        ops.push(make_op("Q", vec![]));
        ops.extend(text_at(5.0, 100.0, 10.0, "本文"));
        let backend = MockBackend::single_page(mincho_font(), ops);

        let spans = extract_page_spans(&backend, (1, 0)).unwrap();
        assert_eq!(spans.len(), 2);
        assert!((spans[0].x - 20.0).abs() < 0.01);
        assert!((spans[0].y - 220.0).abs() < 0.01);
        assert!((spans[0].font_size - 20.0).abs() < 0.01);
        assert!((spans[0].width - 40.0).abs() < 0.01);
        // Q restored the identity matrix.
        assert!((spans[1].x - 5.0).abs() < 0.01);
        assert!((spans[1].font_size - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_tj_array_kerning_inserts_space_for_latin_only() {
        let ops = vec![
            make_op("BT", vec![]),
            tf_op(b"F1", 10.0),
            tm_op(0.0, 500.0),
            make_op(
                "TJ",
                vec![PdfValue::Array(vec![
                    PdfValue::Str(b"Society".to_vec()),
                    PdfValue::Integer(-300),
                    PdfValue::Str(b"5.0".to_vec()),
                    PdfValue::Integer(-300),
                    PdfValue::Str("社会".as_bytes().to_vec()),
                    PdfValue::Integer(-300),
                    PdfValue::Str("実現".as_bytes().to_vec()),
                ])],
            ),
            make_op("ET", vec![]),
        ];
        let backend = MockBackend::single_page(mincho_font(), ops);

        let spans = extract_page_spans(&backend, (1, 0)).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Society 5.0 社会実現");
    }

    #[test]
    fn test_unknown_font_keeps_resource_key() {
        let backend = MockBackend::single_page(vec![], text_at(0.0, 0.0, 9.0, "abc"));
        let spans = extract_page_spans(&backend, (1, 0)).unwrap();
        assert_eq!(spans[0].font_name, "F1");
    }

    #[test]
    fn test_empty_strings_produce_no_spans() {
        let backend = MockBackend::single_page(mincho_font(), text_at(0.0, 0.0, 9.0, ""));
        assert!(extract_page_spans(&backend, (1, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_form_xobject_text_uses_form_matrix() {
        let mut ops = vec![
            make_op("q", vec![]),
            make_op(
                "cm",
                [1.0, 0.0, 0.0, 1.0, 100.0, 0.0]
                    .into_iter()
                    .map(PdfValue::Real)
                    .collect(),
            ),
            do_op(b"X1"),
            make_op("Q", vec![]),
        ];
        ops.extend(text_at(10.0, 10.0, 10.0, "本文"));
        let mut backend = MockBackend::single_page(mincho_font(), ops);
        backend.add_form(
            b"X1",
            (9, 0),
            [1.0, 0.0, 0.0, 1.0, 0.0, 50.0],
            text_at(20.0, 700.0, 10.0, "図表"),
        );

        let spans = extract_page_spans(&backend, (1, 0)).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "図表");
        assert!((spans[0].x - 120.0).abs() < 0.01);
        assert!((spans[0].y - 750.0).abs() < 0.01);
        // The page's own matrix is untouched by the form.
        assert!((spans[1].x - 10.0).abs() < 0.01);
        assert!((spans[1].y - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_self_drawing_form_is_walked_once() {
        let mut backend = MockBackend::single_page(mincho_font(), vec![do_op(b"X1")]);
        let mut form_ops = text_at(0.0, 0.0, 10.0, "再帰");
        form_ops.push(do_op(b"X1"));
        backend.add_form(b"X1", (9, 0), IDENTITY_MATRIX, form_ops);

        let spans = extract_page_spans(&backend, (1, 0)).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "再帰");
    }

    #[test]
    fn test_mutually_nested_forms_stop_at_the_cycle() {
        let mut backend = MockBackend::single_page(mincho_font(), vec![do_op(b"A")]);
        let mut a_ops = text_at(0.0, 0.0, 10.0, "甲");
        a_ops.push(do_op(b"B"));
        let mut b_ops = text_at(0.0, 20.0, 10.0, "乙");
        b_ops.push(do_op(b"A"));
        backend.add_form(b"A", (10, 0), IDENTITY_MATRIX, a_ops);
        backend.add_form(b"B", (11, 0), IDENTITY_MATRIX, b_ops);

        let texts: Vec<String> = extract_page_spans(&backend, (1, 0))
            .unwrap()
            .into_iter()
            .map(|s| s.text)
            .collect();
        assert_eq!(texts, vec!["甲", "乙"]);
    }

    #[test]
    fn test_image_xobject_is_ignored() {
        let mut ops = vec![do_op(b"Im1")];
        ops.extend(text_at(0.0, 0.0, 9.0, "頁"));
        let backend = MockBackend::single_page(mincho_font(), ops);
        assert_eq!(extract_page_spans(&backend, (1, 0)).unwrap().len(), 1);
    }

    #[test]
    fn test_extract_all_pages_reports_boxes() {
        let mut backend = MockBackend::single_page(mincho_font(), text_at(0.0, 0.0, 9.0, "頁"));
        backend.page_ids.insert(2, (2, 0));
        let pages = extract_all_pages(&backend);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].0, 2);
        assert_eq!(pages[1].1.width(), 595.0);
        assert_eq!(pages[1].1.height(), 842.0);
    }

    #[test]
    fn test_unreadable_page_is_skipped_not_fatal() {
        let mut backend = MockBackend::single_page(mincho_font(), text_at(0.0, 0.0, 9.0, "頁"));
        backend.page_ids.insert(2, (2, 0));
        backend.page_ids.insert(3, (3, 0));
        backend.unreadable.push((2, 0));

        let pages = extract_all_pages(&backend);
        let counts: Vec<(u32, usize)> = pages.iter().map(|(n, _, s)| (*n, s.len())).collect();
        assert_eq!(counts, vec![(1, 1), (2, 0), (3, 1)]);
    }

    #[test]
    fn test_plain_decoder_matches_simple_decoding() {
        let bytes = "白書".as_bytes();
        assert_eq!(TextDecoder::Plain.decode(bytes), decode_text_simple(bytes));
    }

    // -- Documents built with lopdf ----------------------------------------

    #[test]
    fn test_lopdf_form_xobject_text_is_extracted() {
        let backend = build_document(
            helvetica(),
            vec![],
            dictionary! {},
            b"BT /F1 10 Tf 50 700 Td (Body) Tj ET q 1 0 0 1 0 -100 cm /X1 Do Q",
            |doc, page_id, _| {
                let form_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Form",
                        "BBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                        "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 0.into(), 10.into()],
                    },
                    b"BT /F1 12 Tf 72 500 Td (Chart) Tj ET".to_vec(),
                ));
                if let Ok(page) = doc.get_dictionary_mut(page_id) {
                    page.set(
                        "Resources",
                        dictionary! { "XObject" => dictionary! { "X1" => form_id } },
                    );
                }
            },
        );

        let page_id = *backend.pages().values().next().unwrap();
        let spans = extract_page_spans(&backend, page_id).unwrap();
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Body", "Chart"]);
        assert_eq!(spans[1].font_name, "Helvetica");
        assert!((spans[1].x - 72.0).abs() < 0.01);
        assert!((spans[1].y - 410.0).abs() < 0.01);
    }

    #[test]
    fn test_lopdf_self_referencing_form_terminates() {
        let backend = build_document(
            helvetica(),
            vec![],
            dictionary! {},
            b"/X1 Do",
            |doc, page_id, font_id| {
                let form_id = doc.new_object_id();
                let form = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Form",
                        "BBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                        "Resources" => dictionary! {
                            "Font" => dictionary! { "F1" => font_id },
                            "XObject" => dictionary! { "X1" => form_id },
                        },
                    },
                    b"BT /F1 10 Tf 0 0 Td (Loop) Tj ET /X1 Do".to_vec(),
                );
                doc.objects.insert(form_id, form.into());
                if let Ok(page) = doc.get_dictionary_mut(page_id) {
                    page.set(
                        "Resources",
                        dictionary! { "XObject" => dictionary! { "X1" => form_id } },
                    );
                }
            },
        );

        let page_id = *backend.pages().values().next().unwrap();
        let spans = extract_page_spans(&backend, page_id).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Loop");
    }
}
