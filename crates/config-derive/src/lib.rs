//! Derives runtime field access for configuration structs.
//!
//! `#[derive(OnlineConfig)]` generates `set_field`/`get_field` plus a few
//! lookup helpers so a config struct can be poked at by name (CLI `CONFIG
//! SET`, admin tooling) without a hand-written match per field.
//!
//! Field attributes, default is mutable:
//! - `#[online_config(immutable)]` rejects `set_field`
//! - `#[online_config(mutable)]` explicit opt-in, same as the default
//! - `#[online_config(callback = "method")]` runs `self.method()` after the
//!   field is assigned; `method` must return `Result<(), String>`

use proc_macro::TokenStream;
use quote::quote;
use syn::Data;
use syn::DeriveInput;
use syn::Fields;
use syn::parse_macro_input;

enum FieldMode {
	Mutable,
	Immutable,
	Callback(syn::Ident),
}

fn field_mode(field: &syn::Field) -> syn::Result<FieldMode> {
	let mut mode = FieldMode::Mutable;
	for attr in &field.attrs {
		if !attr.path().is_ident("online_config") {
			continue;
		}
		attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("immutable") {
				mode = FieldMode::Immutable;
			} else if meta.path.is_ident("mutable") {
				mode = FieldMode::Mutable;
			} else if meta.path.is_ident("callback") {
				let lit: syn::LitStr = meta.value()?.parse()?;
				mode = FieldMode::Callback(syn::Ident::new(&lit.value(), lit.span()));
			} else {
				return Err(meta.error("unrecognized online_config attribute"));
			}
			Ok(())
		})?;
	}
	Ok(mode)
}

#[proc_macro_derive(OnlineConfig, attributes(online_config))]
pub fn derive_online_config(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);
	let name = &input.ident;

	let Data::Struct(data) = &input.data else {
		return syn::Error::new_spanned(&input, "OnlineConfig can only be derived for structs")
			.to_compile_error()
			.into();
	};
	let Fields::Named(fields) = &data.fields else {
		return syn::Error::new_spanned(&input, "OnlineConfig requires named fields")
			.to_compile_error()
			.into();
	};

	let mut set_arms = Vec::new();
	let mut get_arms = Vec::new();
	let mut field_names = Vec::new();
	let mut all_fields_entries = Vec::new();

	for field in &fields.named {
		let ident = field.ident.as_ref().expect("named field");
		let ty = &field.ty;
		let name_str = ident.to_string();

		let mode = match field_mode(field) {
			Ok(mode) => mode,
			Err(e) => return e.to_compile_error().into(),
		};

		field_names.push(name_str.clone());
		get_arms.push(quote! {
			#name_str => Ok(self.#ident.to_string()),
		});
		all_fields_entries.push(quote! {
			(#name_str, self.#ident.to_string()),
		});

		set_arms.push(match mode {
			FieldMode::Immutable => quote! {
				#name_str => Err(format!("Field '{}' is immutable", key)),
			},
			FieldMode::Mutable => quote! {
				#name_str => {
					self.#ident = <#ty as std::str::FromStr>::from_str(value).map_err(|e| e.to_string())?;
					Ok(())
				}
			},
			FieldMode::Callback(callback) => quote! {
				#name_str => {
					self.#ident = <#ty as std::str::FromStr>::from_str(value).map_err(|e| e.to_string())?;
					self.#callback()?;
					Ok(())
				}
			},
		});
	}

	let expanded = quote! {
		impl #name {
			/// Parses `value` and assigns it to the field named `key`.
			pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), String> {
				match key {
					#(#set_arms)*
					_ => Err(format!("Field '{}' not found", key)),
				}
			}

			/// Renders the field named `key` via its `Display` impl.
			pub fn get_field(&self, key: &str) -> Result<String, String> {
				match key {
					#(#get_arms)*
					_ => Err(format!("Field '{}' not found", key)),
				}
			}

			/// All field names, in declaration order.
			pub fn list_fields() -> Vec<&'static str> {
				vec![#(#field_names),*]
			}

			/// Every field paired with its current rendered value.
			pub fn get_all_fields(&self) -> Vec<(&'static str, String)> {
				vec![#(#all_fields_entries)*]
			}

			fn field_matches_pattern(field: &str, pattern: &str) -> bool {
				if pattern == "*" {
					return true;
				}
				let starts = pattern.starts_with('*');
				let ends = pattern.ends_with('*');
				match (starts, ends) {
					(true, true) if pattern.len() >= 2 => field.contains(&pattern[1..pattern.len() - 1]),
					(true, false) => field.ends_with(&pattern[1..]),
					(false, true) => field.starts_with(&pattern[..pattern.len() - 1]),
					_ => field == pattern,
				}
			}

			/// Field names matching a glob pattern (`*`, `prefix*`, `*suffix`, `*mid*`, or exact).
			pub fn match_fields(pattern: &str) -> Vec<&'static str> {
				Self::list_fields()
					.into_iter()
					.filter(|f| Self::field_matches_pattern(f, pattern))
					.collect()
			}
		}
	};

	expanded.into()
}
