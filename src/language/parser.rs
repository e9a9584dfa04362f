use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
    types::{
        AssocBinding, Delimiter, FnPtrType, FnSugar, GenericArg, GenericArgs, Lifetime, MacroCall,
        NodeIdGen, Path, PathSegment, PolyTraitRef, QualifiedSelf, TraitObjectKind, TypeBound,
        TypeExpr,
    },
};
use tracing::debug;

pub fn parse_file(source: &str, ids: &mut NodeIdGen) -> Result<SourceFile, SyntaxErrors> {
    let tokens = tokenize(source)?;
    Parser::new(source, tokens, ids).parse_file()
}

/// Parses a standalone type such as `Vec<u32>` or `<T as Iterator>::Item`.
pub fn parse_type(source: &str, ids: &mut NodeIdGen) -> Result<TypeExpr, SyntaxErrors> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(source, tokens, ids);
    let ty = parser.parse_type().map_err(SyntaxErrors::single)?;
    parser.finish_fragment(ty)
}

pub fn parse_expr(source: &str, ids: &mut NodeIdGen) -> Result<Expr, SyntaxErrors> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(source, tokens, ids);
    let expr = parser.parse_expr().map_err(SyntaxErrors::single)?;
    parser.finish_fragment(expr)
}

pub fn parse_type_path(source: &str, ids: &mut NodeIdGen) -> Result<Path, SyntaxErrors> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(source, tokens, ids);
    let path = parser
        .parse_path(PathMode::Type)
        .map_err(SyntaxErrors::single)?;
    parser.finish_fragment(path)
}

fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxErrors> {
    lex(source).map_err(|errors| {
        SyntaxErrors::new(errors.into_iter().map(SyntaxError::from).collect())
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PathMode {
    /// `Foo<T>` and `Fn(A) -> B` are accepted without `::`.
    Type,
    /// Generic arguments require a turbofish.
    Expr,
}

static EOF: TokenKind = TokenKind::Eof;

struct Parser<'a, 'i> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
    ids: &'i mut NodeIdGen,
    suppress_block_literal: bool,
    last_span: Option<Span>,
}

impl<'a, 'i> Parser<'a, 'i> {
    fn new(source: &'a str, tokens: Vec<Token>, ids: &'i mut NodeIdGen) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            errors: Vec::new(),
            ids,
            suppress_block_literal: false,
            last_span: None,
        }
    }

    fn parse_file(mut self) -> Result<SourceFile, SyntaxErrors> {
        let items = self.parse_items(false);
        if self.errors.is_empty() {
            Ok(SourceFile { items })
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn finish_fragment<T>(mut self, node: T) -> Result<T, SyntaxErrors> {
        if !self.is_eof() {
            let err = self.error_here(&format!(
                "Unexpected {} after end of fragment",
                self.peek().describe()
            ));
            self.report(err);
        }
        if self.errors.is_empty() {
            Ok(node)
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_items(&mut self, in_braces: bool) -> Vec<Item> {
        let mut items = Vec::new();
        loop {
            if self.is_eof() || (in_braces && self.check(TokenKind::RBrace)) {
                break;
            }
            if self.matches(TokenKind::Semi) {
                continue;
            }
            match self.parse_item() {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(err) => {
                    self.report(err);
                    self.synchronize_item();
                }
            }
        }
        items
    }

    /// Returns `Ok(None)` for constructs that are consumed but not modelled,
    /// such as item-position macro invocations.
    fn parse_item(&mut self) -> Result<Option<Item>, SyntaxError> {
        self.skip_attributes()?;
        if self.is_eof() || self.check(TokenKind::RBrace) {
            return Ok(None);
        }
        let start = self.current_span_start();
        let visibility = self.parse_visibility()?;

        let kind = match self.peek().clone() {
            TokenKind::Use => {
                self.advance();
                let tree = self.parse_use_tree()?;
                self.expect(TokenKind::Semi)?;
                ItemKind::Use(tree)
            }
            TokenKind::Struct => {
                self.advance();
                ItemKind::Struct(self.parse_struct()?)
            }
            TokenKind::Enum => {
                self.advance();
                ItemKind::Enum(self.parse_enum()?)
            }
            TokenKind::Type => {
                self.advance();
                let def = self.parse_type_alias()?;
                ItemKind::TypeAlias(def)
            }
            TokenKind::Trait => {
                self.advance();
                ItemKind::Trait(self.parse_trait(false)?)
            }
            TokenKind::Impl => {
                self.advance();
                ItemKind::Impl(self.parse_impl(false)?)
            }
            TokenKind::Unsafe if self.peek_n(1) == &TokenKind::Trait => {
                self.advance();
                self.advance();
                ItemKind::Trait(self.parse_trait(true)?)
            }
            TokenKind::Unsafe if self.peek_n(1) == &TokenKind::Impl => {
                self.advance();
                self.advance();
                ItemKind::Impl(self.parse_impl(true)?)
            }
            TokenKind::Mod => {
                self.advance();
                ItemKind::Mod(self.parse_mod()?)
            }
            TokenKind::Const
                if matches!(
                    self.peek_n(1),
                    TokenKind::Identifier(_) | TokenKind::Underscore
                ) =>
            {
                self.advance();
                ItemKind::Const(self.parse_const(false)?)
            }
            TokenKind::Static => {
                self.advance();
                self.matches(TokenKind::Mut);
                ItemKind::Const(self.parse_const(true)?)
            }
            TokenKind::Fn
            | TokenKind::Const
            | TokenKind::Async
            | TokenKind::Unsafe
            | TokenKind::Extern => ItemKind::Fn(self.parse_fn()?),
            TokenKind::Identifier(name)
                if name == "macro_rules" && self.peek_n(1) == &TokenKind::Bang =>
            {
                self.advance();
                self.advance();
                ItemKind::MacroRules(self.parse_macro_rules()?)
            }
            TokenKind::Identifier(_) | TokenKind::ColonColon => {
                // item-position macro invocation such as `thread_local! { .. }`
                let path = self.parse_path(PathMode::Expr)?;
                if !self.check(TokenKind::Bang) {
                    return Err(SyntaxError::new("Expected item", path.span));
                }
                self.advance();
                let call = self.parse_macro_call_body(path)?;
                if call.delimiter != Delimiter::Brace {
                    self.expect(TokenKind::Semi)?;
                }
                return Ok(None);
            }
            _ => return Err(self.error_here("Expected item")),
        };

        let end = self.last_span_end(start);
        Ok(Some(Item {
            kind,
            visibility,
            span: Span::new(start, end),
        }))
    }

    fn skip_attributes(&mut self) -> Result<(), SyntaxError> {
        while self.check(TokenKind::Pound) {
            self.advance();
            self.matches(TokenKind::Bang);
            if !self.check(TokenKind::LBracket) {
                return Err(self.error_here("Expected '[' after '#'"));
            }
            self.skip_delimited()?;
        }
        Ok(())
    }

    fn parse_visibility(&mut self) -> Result<Visibility, SyntaxError> {
        if !self.matches(TokenKind::Pub) {
            return Ok(Visibility::Private);
        }
        if self.check(TokenKind::LParen) {
            let restricted = matches!(
                self.peek_n(1),
                TokenKind::Crate | TokenKind::Super | TokenKind::SelfLower | TokenKind::In
            );
            if restricted {
                self.skip_delimited()?;
                return Ok(Visibility::Crate);
            }
        }
        Ok(Visibility::Public)
    }

    fn parse_use_tree(&mut self) -> Result<UseTree, SyntaxError> {
        let start = self.current_span_start();
        let global = self.matches(TokenKind::ColonColon);
        let mut prefix = Vec::new();

        loop {
            if self.matches(TokenKind::Star) {
                return Ok(UseTree {
                    global,
                    prefix,
                    kind: UseTreeKind::Glob,
                    span: Span::new(start, self.last_span_end(start)),
                });
            }
            if self.check(TokenKind::LBrace) {
                self.advance();
                let mut children = Vec::new();
                while !self.check(TokenKind::RBrace) && !self.is_eof() {
                    children.push(self.parse_use_tree()?);
                    if !self.matches(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace)?;
                return Ok(UseTree {
                    global,
                    prefix,
                    kind: UseTreeKind::Nested(children),
                    span: Span::new(start, self.last_span_end(start)),
                });
            }

            prefix.push(self.expect_path_segment_name("Expected path in use declaration")?);
            if !self.matches(TokenKind::ColonColon) {
                break;
            }
        }

        let alias = if self.matches(TokenKind::As) {
            if self.check(TokenKind::Underscore) {
                let span = self.advance().span;
                Some(Ident::new("_", span))
            } else {
                Some(self.expect_identifier("Expected alias after 'as'")?)
            }
        } else {
            None
        };

        Ok(UseTree {
            global,
            prefix,
            kind: UseTreeKind::Simple { alias },
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    fn parse_struct(&mut self) -> Result<StructDef, SyntaxError> {
        let name = self.expect_identifier("Expected struct name")?;
        let mut generics = self.parse_generics()?;

        let fields = if self.check(TokenKind::LParen) {
            let fields = self.parse_tuple_fields()?;
            self.parse_where_clause(&mut generics)?;
            self.expect(TokenKind::Semi)?;
            StructFields::Tuple(fields)
        } else {
            self.parse_where_clause(&mut generics)?;
            if self.matches(TokenKind::Semi) {
                StructFields::Unit
            } else {
                StructFields::Named(self.parse_named_fields()?)
            }
        };

        Ok(StructDef {
            name,
            generics,
            fields,
        })
    }

    fn parse_named_fields(&mut self) -> Result<Vec<FieldDef>, SyntaxError> {
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            self.skip_attributes()?;
            let field_start = self.current_span_start();
            let visibility = self.parse_visibility()?;
            let name = self.expect_identifier("Expected field name")?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            fields.push(FieldDef {
                name: Some(name),
                visibility,
                ty,
                span: Span::new(field_start, self.last_span_end(field_start)),
            });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(fields)
    }

    fn parse_tuple_fields(&mut self) -> Result<Vec<FieldDef>, SyntaxError> {
        self.expect(TokenKind::LParen)?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_eof() {
            self.skip_attributes()?;
            let field_start = self.current_span_start();
            let visibility = self.parse_visibility()?;
            let ty = self.parse_type()?;
            fields.push(FieldDef {
                name: None,
                visibility,
                ty,
                span: Span::new(field_start, self.last_span_end(field_start)),
            });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(fields)
    }

    fn parse_enum(&mut self) -> Result<EnumDef, SyntaxError> {
        let name = self.expect_identifier("Expected enum name")?;
        let mut generics = self.parse_generics()?;
        self.parse_where_clause(&mut generics)?;
        self.expect(TokenKind::LBrace)?;

        let mut variants = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            self.skip_attributes()?;
            let variant_start = self.current_span_start();
            let variant_name = self.expect_identifier("Expected variant name")?;
            let fields = if self.check(TokenKind::LParen) {
                StructFields::Tuple(self.parse_tuple_fields()?)
            } else if self.check(TokenKind::LBrace) {
                StructFields::Named(self.parse_named_fields()?)
            } else {
                StructFields::Unit
            };
            let discriminant = if self.matches(TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            variants.push(VariantDef {
                name: variant_name,
                fields,
                discriminant,
                span: Span::new(variant_start, self.last_span_end(variant_start)),
            });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(EnumDef {
            name,
            generics,
            variants,
        })
    }

    fn parse_type_alias(&mut self) -> Result<TypeAliasDef, SyntaxError> {
        let name = self.expect_identifier("Expected type name")?;
        let mut generics = self.parse_generics()?;
        let bounds = if self.matches(TokenKind::Colon) {
            self.parse_bounds()?
        } else {
            Vec::new()
        };
        self.parse_where_clause(&mut generics)?;
        let ty = if self.matches(TokenKind::Eq) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.parse_where_clause(&mut generics)?;
        self.expect(TokenKind::Semi)?;
        Ok(TypeAliasDef {
            name,
            generics,
            bounds,
            ty,
        })
    }

    fn parse_trait(&mut self, is_unsafe: bool) -> Result<TraitDef, SyntaxError> {
        let name = self.expect_identifier("Expected trait name")?;
        let mut generics = self.parse_generics()?;
        let supertraits = if self.matches(TokenKind::Colon) {
            self.parse_bounds()?
        } else {
            Vec::new()
        };
        self.parse_where_clause(&mut generics)?;
        let items = self.parse_assoc_items()?;
        Ok(TraitDef {
            name,
            is_unsafe,
            generics,
            supertraits,
            items,
        })
    }

    fn parse_impl(&mut self, is_unsafe: bool) -> Result<ImplDef, SyntaxError> {
        let mut generics = self.parse_generics()?;
        let negative = self.matches(TokenKind::Bang);
        let first = self.parse_type()?;

        let (trait_ref, self_ty) = if self.matches(TokenKind::For) {
            let trait_ref = match first {
                TypeExpr::Path(path) => path,
                other => {
                    return Err(SyntaxError::new("Expected trait path in impl header", other.span()))
                }
            };
            (Some(trait_ref), self.parse_type()?)
        } else {
            (None, first)
        };

        self.parse_where_clause(&mut generics)?;
        let items = self.parse_assoc_items()?;
        Ok(ImplDef {
            generics,
            is_unsafe,
            negative,
            trait_ref,
            self_ty,
            items,
        })
    }

    fn parse_assoc_items(&mut self) -> Result<Vec<AssocItem>, SyntaxError> {
        self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            self.skip_attributes()?;
            let start = self.current_span_start();
            let visibility = self.parse_visibility()?;
            let kind = match self.peek() {
                TokenKind::Type => {
                    self.advance();
                    AssocItemKind::Type(self.parse_type_alias()?)
                }
                TokenKind::Const
                    if matches!(
                        self.peek_n(1),
                        TokenKind::Identifier(_) | TokenKind::Underscore
                    ) =>
                {
                    self.advance();
                    AssocItemKind::Const(self.parse_const(false)?)
                }
                TokenKind::Fn
                | TokenKind::Const
                | TokenKind::Async
                | TokenKind::Unsafe
                | TokenKind::Extern => AssocItemKind::Fn(self.parse_fn()?),
                TokenKind::Identifier(_) => {
                    let path = self.parse_path(PathMode::Expr)?;
                    self.expect(TokenKind::Bang)?;
                    let call = self.parse_macro_call_body(path)?;
                    if call.delimiter != Delimiter::Brace {
                        self.expect(TokenKind::Semi)?;
                    }
                    continue;
                }
                _ => return Err(self.error_here("Expected associated item")),
            };
            items.push(AssocItem {
                kind,
                visibility,
                span: Span::new(start, self.last_span_end(start)),
            });
        }
        self.expect(TokenKind::RBrace)?;
        Ok(items)
    }

    fn parse_mod(&mut self) -> Result<ModDef, SyntaxError> {
        let name = self.expect_identifier("Expected module name")?;
        if self.matches(TokenKind::Semi) {
            return Ok(ModDef { name, items: None });
        }
        self.expect(TokenKind::LBrace)?;
        let items = self.parse_items(true);
        self.expect(TokenKind::RBrace)?;
        Ok(ModDef {
            name,
            items: Some(items),
        })
    }

    fn parse_const(&mut self, is_static: bool) -> Result<ConstDef, SyntaxError> {
        let name = if self.check(TokenKind::Underscore) {
            let span = self.advance().span;
            Ident::new("_", span)
        } else {
            self.expect_identifier("Expected constant name")?
        };
        let ty = if self.matches(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let value = if self.matches(TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;
        Ok(ConstDef {
            name,
            is_static,
            ty,
            value,
        })
    }

    fn parse_macro_rules(&mut self) -> Result<MacroDef, SyntaxError> {
        let name = self.expect_identifier("Expected macro name")?;
        let open = self.current_span_start();
        let delimiter = self.peek_delimiter();
        let close = self.skip_delimited()?;
        if delimiter != Some(Delimiter::Brace) {
            self.expect(TokenKind::Semi)?;
        }
        let body = self.source[open + 1..close].to_string();
        Ok(MacroDef { name, body })
    }

    fn parse_fn(&mut self) -> Result<FnDef, SyntaxError> {
        let start = self.current_span_start();
        let mut qualifiers = FnQualifiers::default();
        loop {
            match self.peek() {
                TokenKind::Const => qualifiers.is_const = true,
                TokenKind::Async => qualifiers.is_async = true,
                TokenKind::Unsafe => qualifiers.is_unsafe = true,
                TokenKind::Extern => {
                    self.advance();
                    let abi = match self.peek().clone() {
                        TokenKind::Str(abi) => {
                            self.advance();
                            Some(abi)
                        }
                        _ => None,
                    };
                    qualifiers.abi = Some(abi);
                    continue;
                }
                _ => break,
            }
            self.advance();
        }
        self.expect(TokenKind::Fn)?;
        let name = self.expect_identifier("Expected function name")?;
        let mut generics = self.parse_generics()?;

        self.expect(TokenKind::LParen)?;
        let self_param = self.parse_self_param()?;
        if self_param.is_some() && !self.check(TokenKind::RParen) {
            self.expect(TokenKind::Comma)?;
        }
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_eof() {
            self.skip_attributes()?;
            let param_start = self.current_span_start();
            let pattern = self.parse_pattern()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            params.push(Param {
                pattern,
                ty,
                span: Span::new(param_start, self.last_span_end(param_start)),
            });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        let ret = if self.matches(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.parse_where_clause(&mut generics)?;

        let body = if self.matches(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_fn_body()?)
        };

        Ok(FnDef {
            name,
            qualifiers,
            generics,
            self_param,
            params,
            ret,
            body,
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    /// Bodies using syntax outside the supported subset are kept as empty blocks.
    fn parse_fn_body(&mut self) -> Result<Block, SyntaxError> {
        let checkpoint = self.pos;
        let error_count = self.errors.len();
        match self.parse_block() {
            Ok(block) if self.errors.len() == error_count => Ok(block),
            outcome => {
                if let Err(err) = outcome {
                    debug!(error = %err.message, "skipping unsupported function body");
                }
                self.errors.truncate(error_count);
                self.pos = checkpoint;
                let start = self.current_span_start();
                let end = self.skip_delimited()?;
                Ok(Block {
                    stmts: Vec::new(),
                    tail: None,
                    span: Span::new(start, end + 1),
                })
            }
        }
    }

    fn parse_self_param(&mut self) -> Result<Option<SelfParam>, SyntaxError> {
        let start = self.current_span_start();
        let kind = match (self.peek().clone(), self.peek_n(1).clone()) {
            (TokenKind::SelfLower, _) => {
                self.advance();
                self.parse_self_tail(false)?
            }
            (TokenKind::Mut, TokenKind::SelfLower) => {
                self.advance();
                self.advance();
                self.parse_self_tail(true)?
            }
            (TokenKind::Ampersand, _) => {
                let is_self_ref = matches!(
                    (self.peek_n(1), self.peek_n(2), self.peek_n(3)),
                    (TokenKind::SelfLower, _, _)
                        | (TokenKind::Mut, TokenKind::SelfLower, _)
                        | (TokenKind::Lifetime(_), TokenKind::SelfLower, _)
                        | (TokenKind::Lifetime(_), TokenKind::Mut, TokenKind::SelfLower)
                );
                if !is_self_ref {
                    return Ok(None);
                }
                self.advance();
                let lifetime = if let TokenKind::Lifetime(_) = self.peek() {
                    Some(self.expect_lifetime()?)
                } else {
                    None
                };
                let mutable = self.matches(TokenKind::Mut);
                self.expect(TokenKind::SelfLower)?;
                SelfKind::Ref { lifetime, mutable }
            }
            _ => return Ok(None),
        };
        Ok(Some(SelfParam {
            kind,
            span: Span::new(start, self.last_span_end(start)),
        }))
    }

    fn parse_self_tail(&mut self, mutable: bool) -> Result<SelfKind, SyntaxError> {
        if self.matches(TokenKind::Colon) {
            let ty = self.parse_type()?;
            Ok(SelfKind::Explicit { mutable, ty })
        } else {
            Ok(SelfKind::Value { mutable })
        }
    }

    fn parse_generics(&mut self) -> Result<Generics, SyntaxError> {
        if !self.check(TokenKind::Lt) {
            return Ok(Generics::default());
        }
        let start = self.advance().span.start;
        let mut params = Vec::new();
        while !self.check(TokenKind::Gt) && !self.is_eof() {
            self.skip_attributes()?;
            params.push(self.parse_generic_param()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(TokenKind::Gt)?.span.end;
        Ok(Generics {
            params,
            where_clause: Vec::new(),
            span: Span::new(start, end),
        })
    }

    fn parse_generic_param(&mut self) -> Result<GenericParam, SyntaxError> {
        let start = self.current_span_start();
        if let TokenKind::Lifetime(_) = self.peek() {
            let lifetime = self.expect_lifetime()?;
            let bounds = if self.matches(TokenKind::Colon) {
                self.parse_lifetime_bounds()?
            } else {
                Vec::new()
            };
            return Ok(GenericParam {
                name: Ident::new(lifetime.name, lifetime.span),
                kind: GenericParamKind::Lifetime { bounds },
                span: Span::new(start, self.last_span_end(start)),
            });
        }

        if self.matches(TokenKind::Const) {
            let name = self.expect_identifier("Expected const parameter name")?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            let default = if self.matches(TokenKind::Eq) {
                Some(self.parse_const_arg()?)
            } else {
                None
            };
            return Ok(GenericParam {
                name,
                kind: GenericParamKind::Const { ty, default },
                span: Span::new(start, self.last_span_end(start)),
            });
        }

        let name = self.expect_identifier("Expected generic parameter")?;
        let bounds = if self.matches(TokenKind::Colon) {
            self.parse_bounds()?
        } else {
            Vec::new()
        };
        let default = if self.matches(TokenKind::Eq) {
            Some(self.parse_type()?)
        } else {
            None
        };
        Ok(GenericParam {
            name,
            kind: GenericParamKind::Type { bounds, default },
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    fn parse_where_clause(&mut self, generics: &mut Generics) -> Result<(), SyntaxError> {
        if !self.matches(TokenKind::Where) {
            return Ok(());
        }
        loop {
            if matches!(
                self.peek(),
                TokenKind::LBrace | TokenKind::Semi | TokenKind::Eq | TokenKind::Eof
            ) {
                break;
            }
            let start = self.current_span_start();
            if let TokenKind::Lifetime(_) = self.peek() {
                let lifetime = self.expect_lifetime()?;
                self.expect(TokenKind::Colon)?;
                let bounds = self.parse_lifetime_bounds()?;
                generics.where_clause.push(WherePredicate::Lifetime {
                    lifetime,
                    bounds,
                    span: Span::new(start, self.last_span_end(start)),
                });
            } else {
                let for_lifetimes = self.parse_for_lifetimes()?;
                let ty = self.parse_type()?;
                self.expect(TokenKind::Colon)?;
                let bounds = self.parse_bounds()?;
                generics.where_clause.push(WherePredicate::Bound {
                    for_lifetimes,
                    ty,
                    bounds,
                    span: Span::new(start, self.last_span_end(start)),
                });
            }
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }

    fn parse_for_lifetimes(&mut self) -> Result<Vec<Lifetime>, SyntaxError> {
        if !self.matches(TokenKind::For) {
            return Ok(Vec::new());
        }
        self.expect(TokenKind::Lt)?;
        let mut lifetimes = Vec::new();
        while !self.check(TokenKind::Gt) && !self.is_eof() {
            lifetimes.push(self.expect_lifetime()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Gt)?;
        Ok(lifetimes)
    }

    fn parse_lifetime_bounds(&mut self) -> Result<Vec<Lifetime>, SyntaxError> {
        let mut bounds = Vec::new();
        while let TokenKind::Lifetime(_) = self.peek() {
            bounds.push(self.expect_lifetime()?);
            if !self.matches(TokenKind::Plus) {
                break;
            }
        }
        Ok(bounds)
    }

    fn parse_bounds(&mut self) -> Result<Vec<TypeBound>, SyntaxError> {
        let mut bounds = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Lifetime(_) => {
                    bounds.push(TypeBound::Lifetime(self.expect_lifetime()?));
                }
                TokenKind::Question
                | TokenKind::For
                | TokenKind::Identifier(_)
                | TokenKind::ColonColon
                | TokenKind::SelfUpper
                | TokenKind::SelfLower
                | TokenKind::Super
                | TokenKind::Crate
                | TokenKind::Lt => {
                    let start = self.current_span_start();
                    let for_lifetimes = self.parse_for_lifetimes()?;
                    let maybe = self.matches(TokenKind::Question);
                    let path = self.parse_path(PathMode::Type)?;
                    bounds.push(TypeBound::Trait(PolyTraitRef {
                        for_lifetimes,
                        maybe,
                        path,
                        span: Span::new(start, self.last_span_end(start)),
                    }));
                }
                _ => break,
            }
            if !self.matches(TokenKind::Plus) {
                break;
            }
        }
        Ok(bounds)
    }

    fn parse_type(&mut self) -> Result<TypeExpr, SyntaxError> {
        let start = self.current_span_start();
        match self.peek().clone() {
            TokenKind::LParen => {
                self.advance();
                if self.matches(TokenKind::RParen) {
                    return Ok(TypeExpr::Unit(Span::new(start, self.last_span_end(start))));
                }
                let first = self.parse_type()?;
                if self.matches(TokenKind::RParen) {
                    return Ok(first);
                }
                let mut items = vec![first];
                while self.matches(TokenKind::Comma) {
                    if self.check(TokenKind::RParen) {
                        break;
                    }
                    items.push(self.parse_type()?);
                }
                self.expect(TokenKind::RParen)?;
                Ok(TypeExpr::Tuple(items, Span::new(start, self.last_span_end(start))))
            }
            TokenKind::Bang => {
                self.advance();
                Ok(TypeExpr::Never(Span::new(start, self.last_span_end(start))))
            }
            TokenKind::Underscore => {
                self.advance();
                Ok(TypeExpr::Infer(Span::new(start, self.last_span_end(start))))
            }
            TokenKind::Ampersand => {
                self.advance();
                self.parse_ref_type(start)
            }
            TokenKind::AmpersandAmpersand => {
                self.advance();
                let inner = self.parse_ref_type(start + 1)?;
                Ok(TypeExpr::Ref {
                    lifetime: None,
                    mutable: false,
                    inner: Box::new(inner),
                    span: Span::new(start, self.last_span_end(start)),
                })
            }
            TokenKind::Star => {
                self.advance();
                let mutable = if self.matches(TokenKind::Mut) {
                    true
                } else {
                    self.expect(TokenKind::Const)?;
                    false
                };
                let inner = self.parse_type()?;
                Ok(TypeExpr::Ptr {
                    mutable,
                    inner: Box::new(inner),
                    span: Span::new(start, self.last_span_end(start)),
                })
            }
            TokenKind::LBracket => {
                self.advance();
                let elem = self.parse_type()?;
                if self.matches(TokenKind::Semi) {
                    let len = self.with_block_literals(|parser| parser.parse_expr())?;
                    self.expect(TokenKind::RBracket)?;
                    Ok(TypeExpr::Array {
                        elem: Box::new(elem),
                        len: Box::new(len),
                        span: Span::new(start, self.last_span_end(start)),
                    })
                } else {
                    self.expect(TokenKind::RBracket)?;
                    Ok(TypeExpr::Slice(
                        Box::new(elem),
                        Span::new(start, self.last_span_end(start)),
                    ))
                }
            }
            TokenKind::Fn | TokenKind::Unsafe | TokenKind::Extern => self.parse_fn_ptr(start),
            TokenKind::For => {
                let for_lifetimes = self.parse_for_lifetimes()?;
                if matches!(
                    self.peek(),
                    TokenKind::Fn | TokenKind::Unsafe | TokenKind::Extern
                ) {
                    return self.parse_fn_ptr(start);
                }
                let path = self.parse_path(PathMode::Type)?;
                let bound = TypeBound::Trait(PolyTraitRef {
                    for_lifetimes,
                    maybe: false,
                    path,
                    span: Span::new(start, self.last_span_end(start)),
                });
                Ok(TypeExpr::TraitObject {
                    kind: TraitObjectKind::Dyn,
                    bounds: vec![bound],
                    span: Span::new(start, self.last_span_end(start)),
                })
            }
            TokenKind::Dyn | TokenKind::Impl => {
                let kind = if self.advance().kind == TokenKind::Dyn {
                    TraitObjectKind::Dyn
                } else {
                    TraitObjectKind::Impl
                };
                let bounds = self.parse_bounds()?;
                if bounds.is_empty() {
                    return Err(self.error_here("Expected trait bound"));
                }
                Ok(TypeExpr::TraitObject {
                    kind,
                    bounds,
                    span: Span::new(start, self.last_span_end(start)),
                })
            }
            TokenKind::Lt
            | TokenKind::ColonColon
            | TokenKind::Identifier(_)
            | TokenKind::SelfUpper
            | TokenKind::SelfLower
            | TokenKind::Super
            | TokenKind::Crate => {
                let path = self.parse_path(PathMode::Type)?;
                if self.check(TokenKind::Bang) {
                    self.advance();
                    let call = self.parse_macro_call_body(path)?;
                    return Ok(TypeExpr::Macro(call));
                }
                Ok(TypeExpr::Path(path))
            }
            other => Err(self.error_here(&format!("Expected type, found {}", other.describe()))),
        }
    }

    fn parse_ref_type(&mut self, start: usize) -> Result<TypeExpr, SyntaxError> {
        let lifetime = if let TokenKind::Lifetime(_) = self.peek() {
            Some(self.expect_lifetime()?)
        } else {
            None
        };
        let mutable = self.matches(TokenKind::Mut);
        let inner = self.parse_type()?;
        Ok(TypeExpr::Ref {
            lifetime,
            mutable,
            inner: Box::new(inner),
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    fn parse_fn_ptr(&mut self, start: usize) -> Result<TypeExpr, SyntaxError> {
        let is_unsafe = self.matches(TokenKind::Unsafe);
        let abi = if self.matches(TokenKind::Extern) {
            match self.peek().clone() {
                TokenKind::Str(abi) => {
                    self.advance();
                    Some(Some(abi))
                }
                _ => Some(None),
            }
        } else {
            None
        };
        self.expect(TokenKind::Fn)?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_eof() {
            let named = matches!(
                self.peek(),
                TokenKind::Identifier(_) | TokenKind::Underscore
            ) && self.peek_n(1) == &TokenKind::Colon;
            if named {
                self.advance();
                self.advance();
            }
            params.push(self.parse_type()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        let ret = if self.matches(TokenKind::Arrow) {
            Some(Box::new(self.parse_type()?))
        } else {
            None
        };
        Ok(TypeExpr::FnPtr(FnPtrType {
            is_unsafe,
            abi,
            params,
            ret,
            span: Span::new(start, self.last_span_end(start)),
        }))
    }

    fn parse_path(&mut self, mode: PathMode) -> Result<Path, SyntaxError> {
        let start = self.current_span_start();
        let id = self.ids.next_id();

        let qself = if self.matches(TokenKind::Lt) {
            let ty = self.parse_type()?;
            let trait_ref = if self.matches(TokenKind::As) {
                Some(self.parse_path(PathMode::Type)?)
            } else {
                None
            };
            self.expect(TokenKind::Gt)?;
            self.expect(TokenKind::ColonColon)?;
            Some(Box::new(QualifiedSelf { ty, trait_ref }))
        } else {
            None
        };
        let global = qself.is_none() && self.matches(TokenKind::ColonColon);

        let mut segments = Vec::new();
        loop {
            let name = self.expect_path_segment_name("Expected path segment")?;
            let mut segment = PathSegment::plain(name.name, name.span);

            let turbofish = self.check(TokenKind::ColonColon) && self.peek_n(1) == &TokenKind::Lt;
            if turbofish {
                self.advance();
                let open = self.advance().span.start;
                segment.args = Some(self.parse_generic_args(open)?);
                segment.turbofish = true;
            } else if mode == PathMode::Type && self.check(TokenKind::Lt) {
                let open = self.advance().span.start;
                segment.args = Some(self.parse_generic_args(open)?);
            } else if mode == PathMode::Type && self.check(TokenKind::LParen) {
                segment.fn_sugar = Some(self.parse_fn_sugar()?);
            }
            segment.span = Span::new(segment.span.start, self.last_span_end(start));
            segments.push(segment);

            let continues = self.check(TokenKind::ColonColon) && is_segment_start(self.peek_n(1));
            if !continues {
                break;
            }
            self.advance();
        }

        Ok(Path {
            id,
            qself,
            global,
            segments,
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    /// Parses the arguments after an already consumed `<`.
    fn parse_generic_args(&mut self, open: usize) -> Result<GenericArgs, SyntaxError> {
        let mut args = Vec::new();
        while !self.check(TokenKind::Gt) && !self.is_eof() {
            let arg_start = self.current_span_start();
            let arg = match self.peek().clone() {
                TokenKind::Lifetime(_) => GenericArg::Lifetime(self.expect_lifetime()?),
                TokenKind::Identifier(name) if self.peek_n(1) == &TokenKind::Eq => {
                    self.advance();
                    self.advance();
                    let ty = self.parse_type()?;
                    GenericArg::Binding(AssocBinding {
                        name,
                        ty,
                        span: Span::new(arg_start, self.last_span_end(arg_start)),
                    })
                }
                TokenKind::Integer { .. }
                | TokenKind::Float(_)
                | TokenKind::Char(_)
                | TokenKind::Byte(_)
                | TokenKind::Str(_)
                | TokenKind::ByteStr(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Minus
                | TokenKind::LBrace => GenericArg::Const(self.parse_const_arg()?),
                _ => GenericArg::Type(self.parse_type()?),
            };
            args.push(arg);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(TokenKind::Gt)?.span.end;
        Ok(GenericArgs {
            args,
            span: Span::new(open, end),
        })
    }

    /// A const generic argument: a literal, a negated literal or a block.
    fn parse_const_arg(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span_start();
        match self.peek() {
            TokenKind::LBrace => {
                let block = self.with_block_literals(|parser| parser.parse_block())?;
                Ok(Expr::Block {
                    kind: BlockKind::Plain,
                    block,
                })
            }
            TokenKind::Minus => {
                self.advance();
                let inner = self.parse_literal()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(inner),
                    span: Span::new(start, self.last_span_end(start)),
                })
            }
            _ => self.parse_literal(),
        }
    }

    fn parse_fn_sugar(&mut self) -> Result<FnSugar, SyntaxError> {
        let start = self.expect(TokenKind::LParen)?.span.start;
        let mut inputs = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_eof() {
            inputs.push(self.parse_type()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        let output = if self.matches(TokenKind::Arrow) {
            Some(Box::new(self.parse_type()?))
        } else {
            None
        };
        Ok(FnSugar {
            inputs,
            output,
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    fn parse_macro_call_body(&mut self, path: Path) -> Result<MacroCall, SyntaxError> {
        let start = path.span.start;
        let open = self.current_span_start();
        let delimiter = self
            .peek_delimiter()
            .ok_or_else(|| self.error_here("Expected macro delimiter"))?;
        let close = self.skip_delimited()?;
        Ok(MacroCall {
            path,
            body: self.source[open + 1..close].to_string(),
            delimiter,
            span: Span::new(start, close + 1),
        })
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        self.with_block_literals(|parser| parser.parse_block_contents(start))
    }

    fn parse_block_contents(&mut self, start: usize) -> Result<Block, SyntaxError> {
        let mut stmts = Vec::new();
        let mut tail = None;

        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            if self.starts_item() {
                if let Some(item) = self.parse_item()? {
                    stmts.push(Stmt::Item(Box::new(item)));
                }
                continue;
            }
            if self.check(TokenKind::Let) {
                stmts.push(Stmt::Let(self.parse_let()?));
                continue;
            }

            let expr = self.parse_expr()?;
            if self.matches(TokenKind::Semi) {
                stmts.push(Stmt::Expr(expr));
            } else if self.check(TokenKind::RBrace) {
                tail = Some(Box::new(expr));
            } else if is_block_like(&expr) {
                stmts.push(Stmt::Expr(expr));
            } else {
                return Err(self.error_here(&format!(
                    "Expected `;`, found {}",
                    self.peek().describe()
                )));
            }
        }

        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Block {
            stmts,
            tail,
            span: Span::new(start, end),
        })
    }

    fn starts_item(&self) -> bool {
        match self.peek() {
            TokenKind::Fn
            | TokenKind::Struct
            | TokenKind::Enum
            | TokenKind::Use
            | TokenKind::Static
            | TokenKind::Trait
            | TokenKind::Impl
            | TokenKind::Mod
            | TokenKind::Type
            | TokenKind::Pub
            | TokenKind::Pound
            | TokenKind::Extern => true,
            TokenKind::Const => !matches!(self.peek_n(1), TokenKind::LBrace),
            TokenKind::Unsafe => !matches!(self.peek_n(1), TokenKind::LBrace),
            TokenKind::Async => !matches!(self.peek_n(1), TokenKind::LBrace | TokenKind::Move),
            TokenKind::Identifier(name) => {
                name == "macro_rules" && self.peek_n(1) == &TokenKind::Bang
            }
            _ => false,
        }
    }

    fn parse_let(&mut self) -> Result<LetStmt, SyntaxError> {
        let start = self.expect(TokenKind::Let)?.span.start;
        let pattern = self.parse_pattern()?;
        let ty = if self.matches(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.matches(TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;
        Ok(LetStmt {
            pattern,
            ty,
            init,
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    fn parse_pattern(&mut self) -> Result<Pattern, SyntaxError> {
        let start = self.current_span_start();
        match self.peek().clone() {
            TokenKind::Underscore => {
                let span = self.advance().span;
                Ok(Pattern::Wild(span))
            }
            TokenKind::LParen => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(TokenKind::RParen) && !self.is_eof() {
                    items.push(self.parse_pattern()?);
                    if !self.matches(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen)?;
                Ok(Pattern::Tuple(items, Span::new(start, self.last_span_end(start))))
            }
            TokenKind::Ampersand => {
                self.advance();
                let mutable = self.matches(TokenKind::Mut);
                let inner = self.parse_pattern()?;
                Ok(Pattern::Ref {
                    mutable,
                    inner: Box::new(inner),
                    span: Span::new(start, self.last_span_end(start)),
                })
            }
            _ => {
                let by_ref = self.matches(TokenKind::Ref);
                let mutable = self.matches(TokenKind::Mut);
                let name = self.expect_identifier("Expected pattern")?;
                Ok(Pattern::Ident {
                    name,
                    mutable,
                    by_ref,
                })
            }
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span_start();
        let target = self.parse_binary(0)?;
        if self.check(TokenKind::Eq) {
            self.advance();
            let value = self.parse_expr()?;
            return Ok(Expr::Assign {
                target: Box::new(target),
                value: Box::new(value),
                span: Span::new(start, self.last_span_end(start)),
            });
        }
        Ok(target)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, SyntaxError> {
        let start = self.current_span_start();
        let mut left = self.parse_cast()?;
        while let Some((op, width)) = self.peek_binary_op() {
            if op.precedence() < min_precedence {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            let right = self.parse_binary(op.precedence() + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span: Span::new(start, self.last_span_end(start)),
            };
        }
        Ok(left)
    }

    /// `>>`, `>=` and `<<` arrive as separate tokens; adjacent pairs are joined here.
    fn peek_binary_op(&self) -> Option<(BinaryOp, usize)> {
        let adjacent = |next: TokenKind| {
            self.peek_n(1) == &next
                && match (self.tokens.get(self.pos), self.tokens.get(self.pos + 1)) {
                    (Some(a), Some(b)) => a.span.end == b.span.start,
                    _ => false,
                }
        };
        let op = match self.peek() {
            TokenKind::PipePipe => BinaryOp::Or,
            TokenKind::AmpersandAmpersand => BinaryOp::And,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::BangEq => BinaryOp::Ne,
            TokenKind::LtEq => BinaryOp::Le,
            TokenKind::Lt if adjacent(TokenKind::Lt) => return Some((BinaryOp::Shl, 2)),
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Gt if adjacent(TokenKind::Gt) => return Some((BinaryOp::Shr, 2)),
            TokenKind::Gt if adjacent(TokenKind::Eq) => return Some((BinaryOp::Ge, 2)),
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::Ampersand => BinaryOp::BitAnd,
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Rem,
            _ => return None,
        };
        Some((op, 1))
    }

    fn parse_cast(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span_start();
        let mut expr = self.parse_unary()?;
        while self.matches(TokenKind::As) {
            let ty = self.parse_type()?;
            expr = Expr::Cast {
                expr: Box::new(expr),
                ty,
                span: Span::new(start, self.last_span_end(start)),
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span_start();
        let op = match self.peek() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Star => Some(UnaryOp::Deref),
            TokenKind::Ampersand | TokenKind::AmpersandAmpersand => Some(UnaryOp::Ref),
            _ => None,
        };
        let Some(mut op) = op else {
            let primary = self.parse_primary()?;
            return self.parse_postfix(primary, start);
        };

        let double_ref = self.advance().kind == TokenKind::AmpersandAmpersand;
        if op == UnaryOp::Ref && self.matches(TokenKind::Mut) {
            op = UnaryOp::RefMut;
        }
        let inner = self.parse_unary()?;
        let span = Span::new(start, self.last_span_end(start));
        let mut expr = Expr::Unary {
            op,
            expr: Box::new(inner),
            span,
        };
        if double_ref {
            expr = Expr::Unary {
                op: UnaryOp::Ref,
                expr: Box::new(expr),
                span,
            };
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self, mut expr: Expr, start: usize) -> Result<Expr, SyntaxError> {
        loop {
            match self.peek().clone() {
                TokenKind::LParen => {
                    let args = self.parse_call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        span: Span::new(start, self.last_span_end(start)),
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    match self.peek().clone() {
                        TokenKind::Integer { value, .. } => {
                            let span = self.advance().span;
                            expr = Expr::Field {
                                base: Box::new(expr),
                                name: Ident::new(value.to_string(), span),
                                span: Span::new(start, self.last_span_end(start)),
                            };
                        }
                        _ => {
                            let name = self.expect_identifier("Expected field or method name")?;
                            let mut method = PathSegment::plain(name.name.clone(), name.span);
                            if self.check(TokenKind::ColonColon) && self.peek_n(1) == &TokenKind::Lt {
                                self.advance();
                                let open = self.advance().span.start;
                                method.args = Some(self.parse_generic_args(open)?);
                                method.turbofish = true;
                            }
                            if self.check(TokenKind::LParen) {
                                let args = self.parse_call_args()?;
                                expr = Expr::MethodCall {
                                    receiver: Box::new(expr),
                                    method,
                                    args,
                                    span: Span::new(start, self.last_span_end(start)),
                                };
                            } else if method.args.is_some() {
                                return Err(self.error_here("Expected '(' after method turbofish"));
                            } else {
                                expr = Expr::Field {
                                    base: Box::new(expr),
                                    name,
                                    span: Span::new(start, self.last_span_end(start)),
                                };
                            }
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.with_block_literals(|parser| parser.parse_expr())?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                        span: Span::new(start, self.last_span_end(start)),
                    };
                }
                TokenKind::Question => {
                    self.advance();
                    expr = Expr::Try {
                        expr: Box::new(expr),
                        span: Span::new(start, self.last_span_end(start)),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(TokenKind::LParen)?;
        self.with_block_literals(|parser| {
            let mut args = Vec::new();
            while !parser.check(TokenKind::RParen) && !parser.is_eof() {
                args.push(parser.parse_expr()?);
                if !parser.matches(TokenKind::Comma) {
                    break;
                }
            }
            parser.expect(TokenKind::RParen)?;
            Ok(args)
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span_start();
        match self.peek().clone() {
            TokenKind::Integer { .. }
            | TokenKind::Float(_)
            | TokenKind::Char(_)
            | TokenKind::Byte(_)
            | TokenKind::Str(_)
            | TokenKind::ByteStr(_)
            | TokenKind::True
            | TokenKind::False => self.parse_literal(),
            TokenKind::LParen => {
                self.advance();
                self.with_block_literals(|parser| parser.parse_paren_tail(start))
            }
            TokenKind::LBracket => {
                self.advance();
                self.with_block_literals(|parser| parser.parse_array_tail(start))
            }
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                Ok(Expr::Block {
                    kind: BlockKind::Plain,
                    block,
                })
            }
            TokenKind::Unsafe | TokenKind::Const | TokenKind::Async => {
                let kind = match self.advance().kind {
                    TokenKind::Unsafe => BlockKind::Unsafe,
                    TokenKind::Const => BlockKind::Const,
                    _ => BlockKind::Async,
                };
                if kind == BlockKind::Async {
                    self.matches(TokenKind::Move);
                }
                let block = self.parse_block()?;
                Ok(Expr::Block { kind, block })
            }
            TokenKind::If => self.parse_if(),
            TokenKind::Return => {
                self.advance();
                let value = if matches!(
                    self.peek(),
                    TokenKind::Semi | TokenKind::RBrace | TokenKind::RParen | TokenKind::Comma
                ) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                Ok(Expr::Return(value, Span::new(start, self.last_span_end(start))))
            }
            TokenKind::Lt
            | TokenKind::ColonColon
            | TokenKind::Identifier(_)
            | TokenKind::SelfUpper
            | TokenKind::SelfLower
            | TokenKind::Super
            | TokenKind::Crate => {
                let path = self.parse_path(PathMode::Expr)?;
                if self.check(TokenKind::Bang) {
                    self.advance();
                    let call = self.parse_macro_call_body(path)?;
                    return Ok(Expr::Macro(call));
                }
                if !self.suppress_block_literal
                    && self.check(TokenKind::LBrace)
                    && self.looks_like_struct_literal()
                {
                    return self.parse_struct_literal(path, start);
                }
                Ok(Expr::Path(path))
            }
            other => Err(self.error_here(&format!(
                "Expected expression, found {}",
                other.describe()
            ))),
        }
    }

    fn parse_paren_tail(&mut self, start: usize) -> Result<Expr, SyntaxError> {
        if self.matches(TokenKind::RParen) {
            return Ok(Expr::Tuple(Vec::new(), Span::new(start, self.last_span_end(start))));
        }
        let first = self.parse_expr()?;
        if self.matches(TokenKind::RParen) {
            return Ok(Expr::Paren(
                Box::new(first),
                Span::new(start, self.last_span_end(start)),
            ));
        }
        let mut items = vec![first];
        while self.matches(TokenKind::Comma) {
            if self.check(TokenKind::RParen) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expr::Tuple(items, Span::new(start, self.last_span_end(start))))
    }

    fn parse_array_tail(&mut self, start: usize) -> Result<Expr, SyntaxError> {
        if self.matches(TokenKind::RBracket) {
            return Ok(Expr::Array(Vec::new(), Span::new(start, self.last_span_end(start))));
        }
        let first = self.parse_expr()?;
        if self.matches(TokenKind::Semi) {
            let len = self.parse_expr()?;
            self.expect(TokenKind::RBracket)?;
            return Ok(Expr::Repeat {
                value: Box::new(first),
                len: Box::new(len),
                span: Span::new(start, self.last_span_end(start)),
            });
        }
        let mut items = vec![first];
        while self.matches(TokenKind::Comma) {
            if self.check(TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::Array(items, Span::new(start, self.last_span_end(start))))
    }

    fn looks_like_struct_literal(&self) -> bool {
        match (self.peek_n(1), self.peek_n(2)) {
            (TokenKind::RBrace, _) => true,
            (TokenKind::Identifier(_), TokenKind::Colon | TokenKind::Comma | TokenKind::RBrace) => true,
            _ => false,
        }
    }

    fn parse_struct_literal(&mut self, path: Path, start: usize) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            let name = self.expect_identifier("Expected field name")?;
            let value = if self.matches(TokenKind::Colon) {
                self.parse_expr()?
            } else {
                let mut shorthand = Path::single(name.name.clone());
                shorthand.id = self.ids.next_id();
                shorthand.span = name.span;
                shorthand.segments[0].span = name.span;
                Expr::Path(shorthand)
            };
            fields.push(FieldInit { name, value });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Struct {
            path,
            fields,
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    fn parse_if(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::If)?.span.start;
        let outer = std::mem::replace(&mut self.suppress_block_literal, true);
        let cond = self.parse_expr();
        self.suppress_block_literal = outer;
        let cond = cond?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.matches(TokenKind::Else) {
            if self.check(TokenKind::If) {
                Some(Box::new(self.parse_if()?))
            } else {
                let block = self.parse_block()?;
                Some(Box::new(Expr::Block {
                    kind: BlockKind::Plain,
                    block,
                }))
            }
        } else {
            None
        };
        Ok(Expr::If {
            cond: Box::new(cond),
            then_branch,
            else_branch,
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    fn parse_literal(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.advance().clone();
        let kind = match token.kind {
            TokenKind::Integer { value, suffix } => LitKind::Int { value, suffix },
            TokenKind::Float(text) => LitKind::Float(text),
            TokenKind::Char(ch) => LitKind::Char(ch),
            TokenKind::Byte(byte) => LitKind::Byte(byte),
            TokenKind::Str(text) => LitKind::Str(text),
            TokenKind::ByteStr(bytes) => LitKind::ByteStr(bytes),
            TokenKind::True => LitKind::Bool(true),
            TokenKind::False => LitKind::Bool(false),
            other => {
                return Err(SyntaxError::new(
                    format!("Expected literal, found {}", other.describe()),
                    token.span,
                ))
            }
        };
        Ok(Expr::Literal(Literal {
            kind,
            span: token.span,
        }))
    }

    fn with_block_literals<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let outer = std::mem::replace(&mut self.suppress_block_literal, false);
        let result = f(self);
        self.suppress_block_literal = outer;
        result
    }

    fn peek_delimiter(&self) -> Option<Delimiter> {
        match self.peek() {
            TokenKind::LParen => Some(Delimiter::Paren),
            TokenKind::LBracket => Some(Delimiter::Bracket),
            TokenKind::LBrace => Some(Delimiter::Brace),
            _ => None,
        }
    }

    /// Skips a balanced delimiter group and returns the offset of its closing token.
    fn skip_delimited(&mut self) -> Result<usize, SyntaxError> {
        let open_span = self.tokens.get(self.pos).map(|t| t.span).unwrap_or_default();
        if self.peek_delimiter().is_none() {
            return Err(self.error_here("Expected delimiter"));
        }
        let mut depth = 0usize;
        while !self.is_eof() {
            let token = self.advance();
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(token.span.start);
                    }
                }
                _ => {}
            }
        }
        Err(SyntaxError::new("Unclosed delimiter", open_span))
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Ident, SyntaxError> {
        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Ok(Ident::new(name, span))
            }
            other => Err(self.error_here(&format!("{msg}, found {}", other.describe()))),
        }
    }

    fn expect_path_segment_name(&mut self, msg: &str) -> Result<Ident, SyntaxError> {
        if let Some(text) = self.peek().path_keyword_text() {
            let span = self.advance().span;
            return Ok(Ident::new(text, span));
        }
        self.expect_identifier(msg)
    }

    fn expect_lifetime(&mut self) -> Result<Lifetime, SyntaxError> {
        match self.peek().clone() {
            TokenKind::Lifetime(name) => {
                let span = self.advance().span;
                Ok(Lifetime {
                    id: self.ids.next_id(),
                    name,
                    span,
                })
            }
            other => Err(self.error_here(&format!("Expected lifetime, found {}", other.describe()))),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!(
                "Expected {}, found {}",
                kind.describe(),
                self.peek().describe()
            )))
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        *self.peek() == kind
    }

    fn peek(&self) -> &TokenKind {
        self.peek_n(0)
    }

    fn peek_n(&self, n: usize) -> &TokenKind {
        self.tokens.get(self.pos + n).map(|t| &t.kind).unwrap_or(&EOF)
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len().saturating_sub(1));
        self.pos = (self.pos + 1).min(self.tokens.len());
        let token = &self.tokens[index];
        self.last_span = Some(token.span);
        token
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn current_span_start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or_else(|| self.tokens.last().map(|t| t.span.end).unwrap_or(0))
    }

    fn last_span_end(&self, fallback: usize) -> usize {
        self.last_span.map(|span| span.end).unwrap_or(fallback)
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let span = self
            .tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default();
        SyntaxError::new(message.to_string(), span)
    }

    fn report(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    fn synchronize_item(&mut self) {
        while !self.is_eof() {
            match self.peek() {
                TokenKind::Struct
                | TokenKind::Enum
                | TokenKind::Fn
                | TokenKind::Trait
                | TokenKind::Impl
                | TokenKind::Use
                | TokenKind::Mod
                | TokenKind::Pub => {
                    return;
                }
                TokenKind::LBrace => {
                    if self.skip_delimited().is_err() {
                        return;
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }
    }
}

fn is_segment_start(kind: &TokenKind) -> bool {
    matches!(kind, TokenKind::Identifier(_)) || kind.path_keyword_text().is_some()
}

fn is_block_like(expr: &Expr) -> bool {
    matches!(expr, Expr::Block { .. } | Expr::If { .. })
        || matches!(expr, Expr::Macro(call) if call.delimiter == Delimiter::Brace)
}
