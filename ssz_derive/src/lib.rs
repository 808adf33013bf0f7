//! `#[derive(Ssz)]` for SSZ containers.
//!
//! Generates `SszSize`, `SszRead<C>` (for every context `C`), `SszWrite`,
//! and `SszHash` with field order taken from declaration order, which must
//! match the schema.

use itertools::Itertools as _;
use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, Data, DeriveInput, Fields, GenericParam, Generics, Ident, Type,
};

#[proc_macro_derive(Ssz)]
pub fn derive_ssz(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> Result<proc_macro2::TokenStream, syn::Error> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Ssz can only be derived for structs",
        ));
    };

    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Ssz can only be derived for structs with named fields",
        ));
    };

    let name = &input.ident;

    let field_names = fields
        .named
        .iter()
        .map(|field| field.ident.clone().expect("fields are named"))
        .collect_vec();

    let field_types = fields.named.iter().map(|field| field.ty.clone()).collect_vec();

    let merkle_depth = u8::try_from(field_count_depth(field_names.len()))
        .expect("container field counts are small");

    let size_impl = impl_size(&input.generics, name, &field_types);
    let read_impl = impl_read(&input.generics, name, &field_names, &field_types);
    let write_impl = impl_write(&input.generics, name, &field_names, &field_types);
    let hash_impl = impl_hash(&input.generics, name, &field_names, &field_types, merkle_depth);

    Ok(quote! {
        #size_impl
        #read_impl
        #write_impl
        #hash_impl
    })
}

fn field_count_depth(count: usize) -> u32 {
    count.next_power_of_two().trailing_zeros()
}

fn impl_size(generics: &Generics, name: &Ident, types: &[Type]) -> proc_macro2::TokenStream {
    let mut generics = generics.clone();
    let where_clause = generics.make_where_clause();

    for ty in types {
        where_clause.predicates.push(parse_quote!(#ty: ::ssz::SszSize));
    }

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    quote! {
        impl #impl_generics ::ssz::SszSize for #name #ty_generics #where_clause {
            const SIZE: ::ssz::Size =
                ::ssz::Size::aggregate(&[#(<#types as ::ssz::SszSize>::SIZE),*]);
        }
    }
}

fn impl_read(
    generics: &Generics,
    name: &Ident,
    names: &[Ident],
    types: &[Type],
) -> proc_macro2::TokenStream {
    let ty_generics = {
        let (_, ty_generics, _) = generics.split_for_impl();
        quote!(#ty_generics)
    };

    let mut generics = generics.clone();
    generics
        .params
        .insert(0, GenericParam::Type(parse_quote!(__C)));

    {
        let where_clause = generics.make_where_clause();
        for ty in types {
            where_clause
                .predicates
                .push(parse_quote!(#ty: ::ssz::SszRead<__C>));
        }
    }

    let (impl_generics, _, where_clause) = generics.split_for_impl();

    quote! {
        impl #impl_generics ::ssz::SszRead<__C> for #name #ty_generics #where_clause {
            fn from_ssz_unchecked(
                context: &__C,
                bytes: &[u8],
            ) -> ::core::result::Result<Self, ::ssz::ReadError> {
                let sizes = [#(<#types as ::ssz::SszSize>::SIZE),*];
                let mut reader = ::ssz::ContainerReader::new(&sizes, bytes)?;
                #(let #names = reader.read(context)?;)*
                Ok(Self { #(#names),* })
            }
        }
    }
}

fn impl_write(
    generics: &Generics,
    name: &Ident,
    names: &[Ident],
    types: &[Type],
) -> proc_macro2::TokenStream {
    let mut generics = generics.clone();

    {
        let where_clause = generics.make_where_clause();
        for ty in types {
            where_clause
                .predicates
                .push(parse_quote!(#ty: ::ssz::SszWrite));
        }
    }

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    quote! {
        impl #impl_generics ::ssz::SszWrite for #name #ty_generics #where_clause {
            fn write_fixed(&self, bytes: &mut [u8]) {
                let mut cursor = 0;
                #(
                    let size = <#types as ::ssz::SszSize>::SIZE.fixed_part();
                    self.#names.write_fixed(&mut bytes[cursor..cursor + size]);
                    cursor += size;
                )*
                let _ = cursor;
            }

            fn write_variable(
                &self,
                bytes: &mut ::std::vec::Vec<u8>,
            ) -> ::core::result::Result<(), ::ssz::WriteError> {
                let sizes = [#(<#types as ::ssz::SszSize>::SIZE),*];
                let mut writer = ::ssz::ContainerWriter::new(::ssz::Size::fixed_portion(&sizes));
                #(writer.write(&self.#names)?;)*
                writer.finish(bytes)
            }
        }
    }
}

fn impl_hash(
    generics: &Generics,
    name: &Ident,
    names: &[Ident],
    types: &[Type],
    merkle_depth: u8,
) -> proc_macro2::TokenStream {
    let mut generics = generics.clone();

    {
        let where_clause = generics.make_where_clause();
        for ty in types {
            where_clause
                .predicates
                .push(parse_quote!(#ty: ::ssz::SszHash));
        }
    }

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    quote! {
        impl #impl_generics ::ssz::SszHash for #name #ty_generics #where_clause {
            type PackingFactor = ::ssz::typenum::U1;

            fn hash_tree_root(&self) -> ::ssz::H256 {
                let roots = [#(::ssz::SszHash::hash_tree_root(&self.#names)),*];
                ::ssz::merkle::merkleize_chunks(&roots, #merkle_depth)
            }
        }
    }
}
