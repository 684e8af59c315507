//! # Tripack Derive Macros
//!
//! This crate provides the procedural macros for `tripack`. It automates the implementation
//! of `Sizable`, `Packable` and `Unpackable` for structs and enums.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DataEnum, DataStruct, DeriveInput, Fields, GenericParam, Generics, Ident,
    Index, Member, parse_macro_input, parse_quote,
};

/// Derives `Sizable`, `Packable` and `Unpackable`.
///
/// Fields are visited in declaration order. Enums are prefixed with a `u32`
/// variant index in declaration order.
///
/// Supported attributes:
///
/// * `#[tripack(skip)]` on a field: the field is neither sized nor packed and
///   is set to `Default::default()` when unpacking.
/// * `#[tripack(flat)]` on a struct: the struct is serialized as its raw bytes.
///   It must already derive `zerocopy::{IntoBytes, FromBytes, Immutable}` and `Copy`.
#[proc_macro_derive(Serializable, attributes(tripack))]
pub fn derive_serializable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let container = parse_container_attributes(&input.attrs)?;

    if container.flat {
        return expand_flat(input);
    }

    let bodies = match &input.data {
        Data::Struct(data) => struct_bodies(data)?,
        Data::Enum(data) => enum_bodies(&input.ident, data)?,
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.ident.span(),
                "Serializable cannot be derived for unions",
            ));
        }
    };

    Ok(generate_impls(input, bodies))
}

// --- Attribute parsing ---

#[derive(Default)]
struct ContainerAttributes {
    flat: bool,
}

fn parse_container_attributes(attrs: &[Attribute]) -> syn::Result<ContainerAttributes> {
    let mut parsed = ContainerAttributes::default();
    for attr in attrs {
        if attr.path().is_ident("tripack") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("flat") {
                    parsed.flat = true;
                    return Ok(());
                }
                Err(meta.error("Unknown tripack container attribute. Supported: flat"))
            })?;
        }
    }
    Ok(parsed)
}

/// Returns true if the field carries `#[tripack(skip)]`.
fn is_skipped(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut skip = false;
    for attr in attrs {
        if attr.path().is_ident("tripack") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    return Ok(());
                }
                Err(meta.error("Unknown tripack field attribute. Supported: skip"))
            })?;
        }
    }
    Ok(skip)
}

// --- Field model ---

struct FieldInfo {
    member: Member,
    /// Local binding used when destructuring enum variants.
    binding: Ident,
    skip: bool,
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<FieldInfo>> {
    fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let member = match &field.ident {
                Some(ident) => Member::Named(ident.clone()),
                None => Member::Unnamed(Index::from(i)),
            };
            Ok(FieldInfo {
                member,
                binding: format_ident!("__field{}", i),
                skip: is_skipped(&field.attrs)?,
            })
        })
        .collect()
}

/// `Self { a: <expr>, b: Default::default() }` (or the tuple/unit form) for a constructor path.
fn construct(path: TokenStream2, fields: &Fields, infos: &[FieldInfo]) -> TokenStream2 {
    let values = infos.iter().map(|f| {
        if f.skip {
            quote! { ::core::default::Default::default() }
        } else {
            quote! { tripack::Unpackable::unpack(ar)? }
        }
    });
    match fields {
        Fields::Named(_) => {
            let members = infos.iter().map(|f| &f.member);
            quote! { #path { #(#members: #values),* } }
        }
        Fields::Unnamed(_) => quote! { #path ( #(#values),* ) },
        Fields::Unit => path,
    }
}

// --- Generated method bodies ---

struct Bodies {
    size: TokenStream2,
    pack: TokenStream2,
    unpack: TokenStream2,
    /// `None` keeps the trait's default `unpack_into`.
    unpack_into: Option<TokenStream2>,
}

fn struct_bodies(data: &DataStruct) -> syn::Result<Bodies> {
    let infos = collect_fields(&data.fields)?;
    let live: Vec<&FieldInfo> = infos.iter().filter(|f| !f.skip).collect();

    let size = live.iter().map(|f| {
        let m = &f.member;
        quote! { tripack::Sizable::compute_size(&self.#m, ar); }
    });
    let pack = live.iter().map(|f| {
        let m = &f.member;
        quote! { tripack::Packable::pack(&self.#m, ar)?; }
    });
    let unpack = construct(quote! { Self }, &data.fields, &infos);

    // Field-wise reuse of the occupant's storage.
    let reuse = infos.iter().map(|f| {
        let m = &f.member;
        if f.skip {
            quote! { dest.#m = ::core::default::Default::default(); }
        } else {
            quote! { tripack::Unpackable::unpack_into(tripack::Slot::new(&mut dest.#m), ar)?; }
        }
    });
    let unpack_into = match data.fields {
        Fields::Unit => None,
        _ => Some(quote! {
            let dest = slot.get_mut();
            #(#reuse)*
            Ok(())
        }),
    };

    Ok(Bodies {
        size: quote! { #(#size)* },
        pack: quote! { #(#pack)* Ok(()) },
        unpack: quote! { Ok(#unpack) },
        unpack_into,
    })
}

fn enum_bodies(name: &Ident, data: &DataEnum) -> syn::Result<Bodies> {
    let mut size_arms = Vec::new();
    let mut pack_arms = Vec::new();
    let mut unpack_arms = Vec::new();

    for (index, variant) in data.variants.iter().enumerate() {
        let index = u32::try_from(index)
            .map_err(|_| syn::Error::new(variant.ident.span(), "too many enum variants"))?;
        let vname = &variant.ident;
        let infos = collect_fields(&variant.fields)?;

        let pattern = match &variant.fields {
            Fields::Named(_) => {
                let binds = infos.iter().filter(|f| !f.skip).map(|f| {
                    let m = &f.member;
                    let b = &f.binding;
                    quote! { #m: #b }
                });
                quote! { Self::#vname { #(#binds,)* .. } }
            }
            Fields::Unnamed(_) => {
                let binds = infos.iter().map(|f| {
                    if f.skip {
                        quote! { _ }
                    } else {
                        let b = &f.binding;
                        quote! { #b }
                    }
                });
                quote! { Self::#vname ( #(#binds),* ) }
            }
            Fields::Unit => quote! { Self::#vname },
        };

        let live: Vec<&Ident> = infos.iter().filter(|f| !f.skip).map(|f| &f.binding).collect();

        size_arms.push(quote! {
            #pattern => {
                tripack::rt::size_variant(ar);
                #( tripack::Sizable::compute_size(#live, ar); )*
            }
        });
        pack_arms.push(quote! {
            #pattern => {
                tripack::rt::pack_variant(ar, #index)?;
                #( tripack::Packable::pack(#live, ar)?; )*
            }
        });

        let value = construct(quote! { Self::#vname }, &variant.fields, &infos);
        unpack_arms.push(quote! { #index => Ok(#value), });
    }

    let type_name = name.to_string();

    // An uninhabited enum has nothing to size or pack.
    let (size, pack) = if data.variants.is_empty() {
        (quote! { match *self {} }, quote! { match *self {} })
    } else {
        (
            quote! { match self { #(#size_arms)* } },
            quote! { match self { #(#pack_arms)* } Ok(()) },
        )
    };

    Ok(Bodies {
        size,
        pack,
        unpack: quote! {
            match tripack::rt::unpack_variant(ar)? {
                #(#unpack_arms)*
                other => Err(tripack::rt::unknown_variant(#type_name, other)),
            }
        },
        unpack_into: None,
    })
}

// --- Impl assembly ---

fn with_bound(generics: &Generics, bound: TokenStream2) -> Generics {
    let mut generics = generics.clone();
    for param in &mut generics.params {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(#bound));
        }
    }
    generics
}

fn generate_impls(input: &DeriveInput, bodies: Bodies) -> TokenStream2 {
    let name = &input.ident;
    let alloc = Ident::new("__TripackAlloc", Span::call_site());
    let dest = Ident::new("__TripackDest", Span::call_site());

    let sizable = with_bound(&input.generics, quote!(tripack::Sizable));
    let packable = with_bound(&input.generics, quote!(tripack::Packable));
    let unpackable = with_bound(&input.generics, quote!(tripack::Unpackable));
    let (size_impl, ty_generics, size_where) = sizable.split_for_impl();
    let (pack_impl, _, pack_where) = packable.split_for_impl();
    let (unpack_impl, _, unpack_where) = unpackable.split_for_impl();

    let Bodies {
        size,
        pack,
        unpack,
        unpack_into,
    } = bodies;

    let unpack_into = unpack_into.map(|body| {
        quote! {
            #[allow(unused_variables)]
            fn unpack_into<#alloc: tripack::AllocationPolicy>(
                mut slot: tripack::Slot<'_, Self>,
                ar: &mut tripack::UnpackingArchive<'_, #alloc>,
            ) -> tripack::Result<()> {
                #body
            }
        }
    });

    quote! {
        impl #size_impl tripack::Sizable for #name #ty_generics #size_where {
            #[allow(unused_variables)]
            fn compute_size(&self, ar: &mut tripack::SizingArchive) {
                #size
            }
        }

        impl #pack_impl tripack::Packable for #name #ty_generics #pack_where {
            #[allow(unused_variables)]
            fn pack<#dest: tripack::PackTarget>(
                &self,
                ar: &mut tripack::PackingArchive<#dest>,
            ) -> tripack::Result<()> {
                #pack
            }
        }

        impl #unpack_impl tripack::Unpackable for #name #ty_generics #unpack_where {
            #[allow(unused_variables)]
            fn unpack<#alloc: tripack::AllocationPolicy>(
                ar: &mut tripack::UnpackingArchive<'_, #alloc>,
            ) -> tripack::Result<Self> {
                #unpack
            }

            #unpack_into
        }
    }
}

fn expand_flat(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !matches!(input.data, Data::Struct(_)) {
        return Err(syn::Error::new(
            input.ident.span(),
            "#[tripack(flat)] is only supported on structs",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.ident.span(),
            "#[tripack(flat)] does not support generic structs; use tripack::impl_flat! per instantiation",
        ));
    }
    let name = &input.ident;
    Ok(quote! { tripack::impl_flat!(#name); })
}
