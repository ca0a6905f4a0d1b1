use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, PatType};

/// Operand fields an attribute may name. Each maps to an accessor on
/// `crate::decode::Opcode`.
const FIELDS: [&str; 6] = ["x", "y", "n", "kk", "nnn", "word"];

/// Turns an opcode handler into the uniform `fn(&mut Machine, Opcode)` shape
/// used by the dispatch table.
///
/// Parameters tagged with a field attribute (`#[x]`, `#[y]`, `#[n]`, `#[kk]`,
/// `#[nnn]` or `#[word]`) are bound from the instruction word before the body
/// runs. The single untagged parameter receives the machine.
///
/// ```ignore
/// #[opcode]
/// fn load_byte(machine: &mut Machine, #[x] x: usize, #[kk] kk: u8) -> Result<(), ExecutionError> {
///     *machine.register_mut(x) = kk;
///     machine.advance();
///     Ok(())
/// }
/// ```
///
/// The expansion refers to `crate::decode::Opcode`, so it is only usable
/// inside the core crate.
#[proc_macro_attribute]
pub fn opcode(_args: TokenStream, input: TokenStream) -> TokenStream {
    let function_item = parse_macro_input!(input as ItemFn);

    match expand(function_item) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(function_item: ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = function_item;

    let mut field_names = vec![];
    let mut variable_names = vec![];
    let mut variable_types = vec![];
    let mut machine = None;

    for argument in &sig.inputs {
        let FnArg::Typed(PatType {
            attrs: argument_attrs,
            pat,
            ty,
            ..
        }) = argument
        else {
            return Err(syn::Error::new(
                argument.span(),
                "opcode handlers are free functions and cannot take `self`",
            ));
        };

        match argument_attrs.first() {
            Some(attribute) => {
                let field = attribute
                    .path()
                    .get_ident()
                    .filter(|ident| FIELDS.contains(&ident.to_string().as_str()))
                    .ok_or_else(|| {
                        syn::Error::new(
                            attribute.span(),
                            "expected one of #[x], #[y], #[n], #[kk], #[nnn], #[word]",
                        )
                    })?;
                field_names.push(field.clone());
                variable_names.push(pat.clone());
                variable_types.push(ty.clone());
            }
            None => {
                if machine.is_some() {
                    return Err(syn::Error::new(
                        pat.span(),
                        "only one untagged (machine) parameter is allowed",
                    ));
                }
                machine = Some((pat.clone(), ty.clone()));
            }
        }
    }

    let (machine_name, machine_type) = machine.ok_or_else(|| {
        syn::Error::new(
            sig.ident.span(),
            "opcode handlers need an untagged machine parameter",
        )
    })?;

    let function_name = &sig.ident;
    let output = &sig.output;
    let opcode = Ident::new("opcode", Span::mixed_site());
    let discard = field_names.is_empty().then(|| quote!(let _ = #opcode;));

    Ok(quote! {
        #(#attrs)*
        #vis fn #function_name(
            #machine_name: #machine_type,
            #opcode: crate::decode::Opcode,
        ) #output {
            #(let #variable_names: #variable_types = #opcode.#field_names();)*
            #discard
            #block
        }
    })
}
