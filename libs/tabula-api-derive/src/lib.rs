use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr, Type};

/// Derive macro for row-mapping targets.
///
/// Generates an impl of `tabula_api::Target`:
///
/// - `fields()`: static descriptor table, in declaration order.
/// - `construct()`: `Default::default()`.
/// - `assign()` / `assign_identity()`: typed setters dispatched by field name.
///
/// The struct must implement `Default`.
///
/// # Example
///
/// ```ignore
/// #[derive(Default, Target)]
/// pub struct Product {
///     #[id]
///     pub id: u64,
///
///     #[attribute("price")]
///     pub price: Option<Money>,
///
///     #[attribute] // column name = field name
///     pub name: String,
/// }
/// ```
///
/// Attribute field types must implement `Represented` + `FromValue`
/// (`String`, `f64`, `i64`, `Money`, `DateTime<Utc>`, `Option<_>` of those).
/// Identity field types must implement `TryFrom<usize>`.
#[proc_macro_derive(Target, attributes(id, attribute))]
pub fn derive_target(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

enum Role {
    Identity,
    Attribute(String),
}

struct Bound<'a> {
    ident: &'a Ident,
    name: String,
    ty: &'a Type,
    role: Role,
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Target only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Target only supports structs",
            ))
        }
    };

    let mut bound = Vec::new();

    for field in fields {
        let ident = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "expected named field")
        })?;
        let field_name = ident.unraw().to_string();

        let mut role: Option<Role> = None;
        for attr in &field.attrs {
            let next = if attr.path().is_ident("id") {
                attr.meta.require_path_only()?;
                Role::Identity
            } else if attr.path().is_ident("attribute") {
                let column = match &attr.meta {
                    syn::Meta::Path(_) => field_name.clone(),
                    _ => attr.parse_args::<LitStr>()?.value(),
                };
                if column.is_empty() {
                    return Err(syn::Error::new_spanned(attr, "empty column name"));
                }
                Role::Attribute(column)
            } else {
                continue;
            };

            if role.is_some() {
                return Err(syn::Error::new_spanned(
                    attr,
                    format!("field '{field_name}' has more than one of #[id] / #[attribute]"),
                ));
            }
            role = Some(next);
        }

        if let Some(role) = role {
            bound.push(Bound {
                ident,
                name: field_name,
                ty: &field.ty,
                role,
            });
        }
    }

    let mut descriptor_tokens = Vec::new();
    let mut assign_arms = Vec::new();
    let mut identity_arms = Vec::new();

    for b in &bound {
        let Bound { ident, name: field_name, ty, role } = b;
        match role {
            Role::Identity => {
                descriptor_tokens.push(quote! {
                    tabula_api::schema::FieldDescriptor::identity(#field_name)
                });
                identity_arms.push(quote! {
                    #field_name => tabula_api::target::assign_index(&mut self.#ident, field, index),
                });
            }
            Role::Attribute(column) => {
                descriptor_tokens.push(quote! {
                    tabula_api::schema::FieldDescriptor::attribute(
                        #field_name,
                        #column,
                        <#ty as tabula_api::target::Represented>::REPRESENTATION,
                    )
                });
                assign_arms.push(quote! {
                    #field_name => tabula_api::target::assign_value(&mut self.#ident, field, value),
                });
            }
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics tabula_api::target::Target for #name #ty_generics #where_clause {
            fn fields() -> &'static [tabula_api::schema::FieldDescriptor] {
                const FIELDS: &[tabula_api::schema::FieldDescriptor] = &[
                    #(#descriptor_tokens),*
                ];
                FIELDS
            }

            fn construct() -> ::core::result::Result<Self, tabula_api::error::ConstructionError> {
                ::core::result::Result::Ok(<Self as ::core::default::Default>::default())
            }

            fn assign(
                &mut self,
                field: &str,
                value: tabula_api::value::Value,
            ) -> ::core::result::Result<(), tabula_api::error::AssignmentError> {
                match field {
                    #(#assign_arms)*
                    _ => {
                        let _ = value;
                        ::core::result::Result::Err(
                            tabula_api::error::AssignmentError::unknown_field(field),
                        )
                    }
                }
            }

            fn assign_identity(
                &mut self,
                field: &str,
                index: usize,
            ) -> ::core::result::Result<(), tabula_api::error::AssignmentError> {
                match field {
                    #(#identity_arms)*
                    _ => {
                        let _ = index;
                        ::core::result::Result::Err(
                            tabula_api::error::AssignmentError::unknown_field(field),
                        )
                    }
                }
            }
        }
    };

    Ok(TokenStream::from(expanded))
}
