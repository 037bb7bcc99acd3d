//! The static description of every reflectable type: a recursive-descent
//! parser for the type-string grammar (§6) plus the `SchemaLayout`/
//! `PropertyLayout` structs a view binds against.

use super::error::LayoutError;

/// Pointer-sized control block used by every dynamic (pool-backed) type:
/// string, dynamic array, hash map, hash set, sparse set.
const CONTROL_BLOCK_SIZE: usize = 4;
const CONTROL_BLOCK_ALIGN: usize = 4;

/// A parsed type-string, before layout has been computed.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Primitive(Primitive),
    /// `T[]` — a dynamic array of `T`.
    Array(Box<TypeExpr>),
    /// `[T, N]` — a fixed-size array of `N` elements of `T`.
    FixedArray(Box<TypeExpr>, u32),
    /// `(A | B | ...)` — a tagged union over its variants, in declared order.
    Union(Vec<TypeExpr>),
    /// `[A, B, ...]` — a tuple.
    Tuple(Vec<TypeExpr>),
    /// `map<K, V>`.
    Map(Box<TypeExpr>, Box<TypeExpr>),
    /// `set<E>`.
    Set(Box<TypeExpr>),
    /// A bare identifier that is neither a known primitive nor `map`/`set`:
    /// a user-defined named type, resolved elsewhere against the component
    /// registry.
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    Str,
    SparseSet,
}

impl Primitive {
    fn from_ident(ident: &str) -> Option<Self> {
        Some(match ident {
            "u8" => Primitive::U8,
            "u16" => Primitive::U16,
            "u32" => Primitive::U32,
            "u64" => Primitive::U64,
            "i8" => Primitive::I8,
            "i16" => Primitive::I16,
            "i32" => Primitive::I32,
            "i64" => Primitive::I64,
            "f32" => Primitive::F32,
            "f64" => Primitive::F64,
            "bool" => Primitive::Bool,
            "str" => Primitive::Str,
            "sparseset" => Primitive::SparseSet,
            _ => return None,
        })
    }

    fn layout(self) -> (usize, usize) {
        match self {
            Primitive::U8 | Primitive::I8 | Primitive::Bool => (1, 1),
            Primitive::U16 | Primitive::I16 => (2, 2),
            Primitive::U32 | Primitive::I32 | Primitive::F32 => (4, 4),
            Primitive::U64 | Primitive::I64 | Primitive::F64 => (8, 8),
            // str and sparseset are both control-block-backed dynamic types.
            Primitive::Str | Primitive::SparseSet => (CONTROL_BLOCK_SIZE, CONTROL_BLOCK_ALIGN),
        }
    }

    fn is_dynamic(self) -> bool {
        matches!(self, Primitive::Str | Primitive::SparseSet)
    }
}

impl TypeExpr {
    /// Computed `(size, alignment, has_dynamic_data)` for this type, used to
    /// fill in a property's layout once its offset within the parent is known.
    pub fn layout(&self) -> (usize, usize, bool) {
        match self {
            TypeExpr::Primitive(p) => {
                let (size, align) = p.layout();
                (size, align, p.is_dynamic())
            }
            TypeExpr::Array(_) | TypeExpr::Map(_, _) | TypeExpr::Set(_) => {
                (CONTROL_BLOCK_SIZE, CONTROL_BLOCK_ALIGN, true)
            }
            TypeExpr::Named(_) => (CONTROL_BLOCK_SIZE, CONTROL_BLOCK_ALIGN, false),
            TypeExpr::FixedArray(elem, count) => {
                let (elem_size, elem_align, elem_dynamic) = elem.layout();
                let stride = align_up(elem_size, elem_align);
                (stride * (*count as usize), elem_align, elem_dynamic)
            }
            TypeExpr::Union(variants) => {
                let mut max_align = 1usize;
                let mut max_payload = 0usize;
                let mut dynamic = false;
                for v in variants {
                    let (size, align, d) = v.layout();
                    max_align = max_align.max(align);
                    max_payload = max_payload.max(size);
                    dynamic |= d;
                }
                // [u8 tag][padding to max_align][variant payload]
                let payload_offset = align_up(1, max_align);
                let total = align_up(payload_offset + max_payload, max_align);
                (total, max_align, dynamic)
            }
            TypeExpr::Tuple(elements) => {
                let (offsets, max_align, dynamic) = tuple_layout(elements);
                let end = offsets.last().map(|&(o, s)| o + s).unwrap_or(0);
                (align_up(end, max_align), max_align, dynamic)
            }
        }
    }
}

/// Per-element `(offset, size)` pairs for a tuple's members, in declaration
/// order, alongside the tuple's overall `(max_align, has_dynamic_data)` -
/// the per-element counterpart to `TypeExpr::layout`'s aggregate figures,
/// needed by [`super::tuple::TupleView`] to locate each slot.
pub fn tuple_layout(elements: &[TypeExpr]) -> (Vec<(usize, usize)>, usize, bool) {
    let mut offsets = Vec::with_capacity(elements.len());
    let mut offset = 0usize;
    let mut max_align = 1usize;
    let mut dynamic = false;
    for e in elements {
        let (size, align, d) = e.layout();
        offset = align_up(offset, align);
        offsets.push((offset, size));
        offset += size;
        max_align = max_align.max(align);
        dynamic |= d;
    }
    (offsets, max_align, dynamic)
}

fn align_up(size: usize, align: usize) -> usize {
    (size + align - 1) & !(align - 1)
}

/// Layout of a single named field within a `SchemaLayout`.
#[derive(Debug, Clone)]
pub struct PropertyLayout {
    pub key: String,
    pub order: u32,
    pub type_string: String,
    pub offset: usize,
    pub size: usize,
    pub alignment: usize,
    pub bit_offset: Option<u32>,
    pub bit_width: Option<u32>,
    pub default: Option<Vec<u8>>,
    pub binary_info: BinaryInfo,
}

/// Nestedness/dynamicness metadata for a property, derived from its parsed
/// type string.
#[derive(Debug, Clone)]
pub struct BinaryInfo {
    pub is_dynamic: bool,
    pub variant_count: u32,
    pub element_type: Option<Box<TypeExpr>>,
}

/// The static description of a reflectable type.
#[derive(Debug, Clone)]
pub struct SchemaLayout {
    pub total_size: usize,
    pub alignment: usize,
    pub properties: Vec<PropertyLayout>,
    pub has_dynamic_data: bool,
}

impl SchemaLayout {
    /// Compute a schema from an ordered list of `(key, type_string)` fields,
    /// assigning offsets in declaration order subject to each field's
    /// alignment, per §3's invariant that `offset % alignment == 0` and the
    /// struct's `total_size % alignment == 0`.
    pub fn from_fields(fields: &[(&str, &str)]) -> Result<Self, LayoutError> {
        let mut properties = Vec::with_capacity(fields.len());
        let mut offset = 0usize;
        let mut struct_align = 1usize;
        let mut has_dynamic_data = false;

        for (order, (key, type_string)) in fields.iter().enumerate() {
            let expr = parse_type(type_string)?;
            let (size, align, dynamic) = expr.layout();
            offset = align_up(offset, align);
            has_dynamic_data |= dynamic;
            struct_align = struct_align.max(align);

            let variant_count = match &expr {
                TypeExpr::Union(variants) => variants.len() as u32,
                _ => 0,
            };
            let element_type = match &expr {
                TypeExpr::Array(e) | TypeExpr::Set(e) | TypeExpr::FixedArray(e, _) => {
                    Some(e.clone())
                }
                TypeExpr::Map(_, v) => Some(v.clone()),
                _ => None,
            };

            properties.push(PropertyLayout {
                key: (*key).to_string(),
                order: order as u32,
                type_string: (*type_string).to_string(),
                offset,
                size,
                alignment: align,
                bit_offset: None,
                bit_width: None,
                default: None,
                binary_info: BinaryInfo {
                    is_dynamic: dynamic,
                    variant_count,
                    element_type,
                },
            });

            offset += size;
        }

        Ok(SchemaLayout {
            total_size: align_up(offset, struct_align),
            alignment: struct_align,
            properties,
            has_dynamic_data,
        })
    }
}

/// Parse a type string per the grammar in §6.
pub fn parse_type(input: &str) -> Result<TypeExpr, LayoutError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        source: input,
    };
    let expr = parser.parse_union()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self, msg: &str) -> LayoutError {
        let start = self.pos.min(self.source.len());
        let end = (start + 16).min(self.source.len());
        LayoutError::ParseError {
            pos: self.pos,
            snippet: format!("{msg} near '{}'", &self.source[start..end]),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect(&mut self, c: char) -> Result<(), LayoutError> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    /// `union := suffix ('|' suffix)*`
    fn parse_union(&mut self) -> Result<TypeExpr, LayoutError> {
        let first = self.parse_suffix()?;
        let mut variants = vec![first];
        loop {
            self.skip_ws();
            if self.peek() == Some('|') {
                self.pos += 1;
                variants.push(self.parse_suffix()?);
            } else {
                break;
            }
        }
        Ok(if variants.len() == 1 {
            variants.pop().unwrap()
        } else {
            TypeExpr::Union(variants)
        })
    }

    /// `suffix := primary ('[]')*`
    fn parse_suffix(&mut self) -> Result<TypeExpr, LayoutError> {
        let mut expr = self.parse_primary()?;
        loop {
            self.skip_ws();
            if self.peek() == Some('[') && self.chars.get(self.pos + 1) == Some(&']') {
                self.pos += 2;
                expr = TypeExpr::Array(Box::new(expr));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// `primary := '(' union ')' | '[' union (',' union)+ ']' | '[' union ',' number ']' | ident ('<' generics '>')?`
    fn parse_primary(&mut self) -> Result<TypeExpr, LayoutError> {
        self.skip_ws();
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_union()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some('[') => {
                self.pos += 1;
                let first = self.parse_union()?;
                self.expect(',')?;
                self.skip_ws();
                // A fixed array's second slot is a bare number; a tuple's
                // second (and later) slots are types.
                if let Some(n) = self.try_parse_number() {
                    self.expect(']')?;
                    return Ok(TypeExpr::FixedArray(Box::new(first), n));
                }
                let mut elements = vec![first, self.parse_union()?];
                loop {
                    self.skip_ws();
                    if self.peek() == Some(',') {
                        self.pos += 1;
                        elements.push(self.parse_union()?);
                    } else {
                        break;
                    }
                }
                self.expect(']')?;
                Ok(TypeExpr::Tuple(elements))
            }
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_ident_type(),
            _ => Err(self.error("expected a type")),
        }
    }

    fn try_parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        let mut end = self.pos;
        while matches!(self.chars.get(end), Some(c) if c.is_ascii_digit()) {
            end += 1;
        }
        if end == start {
            return None;
        }
        let text: String = self.chars[start..end].iter().collect();
        let value = text.parse().ok()?;
        self.pos = end;
        Some(value)
    }

    fn parse_ident(&mut self) -> String {
        let start = self.pos;
        let mut end = self.pos;
        while matches!(self.chars.get(end), Some(c) if c.is_alphanumeric() || *c == '_') {
            end += 1;
        }
        self.pos = end;
        self.chars[start..end].iter().collect()
    }

    fn parse_ident_type(&mut self) -> Result<TypeExpr, LayoutError> {
        let ident = self.parse_ident();
        self.skip_ws();
        if self.peek() == Some('<') {
            self.pos += 1;
            let args = self.parse_generics()?;
            self.expect('>')?;
            return build_generic(&ident, args, self);
        }
        if let Some(p) = Primitive::from_ident(&ident) {
            return Ok(TypeExpr::Primitive(p));
        }
        Ok(TypeExpr::Named(ident))
    }

    /// `generics := union (',' union)* | union ',' number`
    fn parse_generics(&mut self) -> Result<Vec<GenericArg>, LayoutError> {
        let mut args = vec![GenericArg::Type(self.parse_union()?)];
        loop {
            self.skip_ws();
            if self.peek() == Some(',') {
                self.pos += 1;
                self.skip_ws();
                if let Some(n) = self.try_parse_number() {
                    args.push(GenericArg::Number(n));
                } else {
                    args.push(GenericArg::Type(self.parse_union()?));
                }
            } else {
                break;
            }
        }
        Ok(args)
    }
}

enum GenericArg {
    Type(TypeExpr),
    Number(u32),
}

fn build_generic(ident: &str, args: Vec<GenericArg>, parser: &Parser) -> Result<TypeExpr, LayoutError> {
    match ident {
        "arr" => match args.into_iter().next() {
            Some(GenericArg::Type(t)) => Ok(TypeExpr::Array(Box::new(t))),
            _ => Err(parser.error("arr<E> expects one type argument")),
        },
        "set" => match args.into_iter().next() {
            Some(GenericArg::Type(t)) => Ok(TypeExpr::Set(Box::new(t))),
            _ => Err(parser.error("set<E> expects one type argument")),
        },
        "map" => {
            let mut it = args.into_iter();
            match (it.next(), it.next()) {
                (Some(GenericArg::Type(k)), Some(GenericArg::Type(v))) => {
                    Ok(TypeExpr::Map(Box::new(k), Box::new(v)))
                }
                _ => Err(parser.error("map<K,V> expects two type arguments")),
            }
        }
        "fixed_arr" => {
            let mut it = args.into_iter();
            match (it.next(), it.next()) {
                (Some(GenericArg::Type(t)), Some(GenericArg::Number(n))) => {
                    Ok(TypeExpr::FixedArray(Box::new(t), n))
                }
                _ => Err(parser.error("fixed_arr<E,N> expects a type and a count")),
            }
        }
        other => Err(parser.error(&format!("unknown generic type '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitives() {
        assert_eq!(parse_type("u32").unwrap(), TypeExpr::Primitive(Primitive::U32));
        assert_eq!(parse_type("bool").unwrap(), TypeExpr::Primitive(Primitive::Bool));
    }

    #[test]
    fn parses_dynamic_array_suffix() {
        let parsed = parse_type("u32[]").unwrap();
        assert_eq!(parsed, TypeExpr::Array(Box::new(TypeExpr::Primitive(Primitive::U32))));
    }

    #[test]
    fn parses_fixed_array() {
        let parsed = parse_type("[u8, 4]").unwrap();
        assert_eq!(parsed, TypeExpr::FixedArray(Box::new(TypeExpr::Primitive(Primitive::U8)), 4));
    }

    #[test]
    fn parses_tuple() {
        let parsed = parse_type("[u32, f32]").unwrap();
        assert_eq!(
            parsed,
            TypeExpr::Tuple(vec![
                TypeExpr::Primitive(Primitive::U32),
                TypeExpr::Primitive(Primitive::F32)
            ])
        );
    }

    #[test]
    fn parses_union() {
        let parsed = parse_type("u32 | str").unwrap();
        assert_eq!(
            parsed,
            TypeExpr::Union(vec![TypeExpr::Primitive(Primitive::U32), TypeExpr::Primitive(Primitive::Str)])
        );
    }

    #[test]
    fn parses_map_and_set_generics() {
        assert_eq!(
            parse_type("map<u32, str>").unwrap(),
            TypeExpr::Map(Box::new(TypeExpr::Primitive(Primitive::U32)), Box::new(TypeExpr::Primitive(Primitive::Str)))
        );
        assert_eq!(parse_type("set<u32>").unwrap(), TypeExpr::Set(Box::new(TypeExpr::Primitive(Primitive::U32))));
    }

    #[test]
    fn rejects_single_element_bracket_array() {
        let err = parse_type("[u32]").unwrap_err();
        assert!(matches!(err, LayoutError::ParseError { .. }));
    }

    #[test]
    fn rejects_trailing_comma() {
        let err = parse_type("[u32, f32,]").unwrap_err();
        assert!(matches!(err, LayoutError::ParseError { .. }));
    }

    #[test]
    fn schema_offsets_respect_alignment() {
        let schema = SchemaLayout::from_fields(&[("a", "u8"), ("b", "u32"), ("c", "u8")]).unwrap();
        assert_eq!(schema.properties[0].offset, 0);
        assert_eq!(schema.properties[1].offset, 4); // padded up to u32 alignment
        assert_eq!(schema.alignment, 4);
        assert_eq!(schema.total_size % schema.alignment, 0);
    }

    #[test]
    fn tuple_layout_assigns_aligned_offsets() {
        let parsed = parse_type("[u8, u32]").unwrap();
        let elements = match parsed {
            TypeExpr::Tuple(elements) => elements,
            _ => panic!("expected a tuple"),
        };
        let (offsets, max_align, _) = tuple_layout(&elements);
        assert_eq!(offsets, vec![(0, 1), (4, 4)]);
        assert_eq!(max_align, 4);
    }

    #[test]
    fn schema_flags_dynamic_fields() {
        let schema = SchemaLayout::from_fields(&[("name", "str"), ("tags", "u32[]")]).unwrap();
        assert!(schema.has_dynamic_data);
        assert!(schema.properties[0].binary_info.is_dynamic);
    }
}
