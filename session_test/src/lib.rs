use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous session test into a synchronous one and inject
/// a `crate::testing::Fixture`.
///
/// The optional argument names the fixture preset, e.g.
/// `#[session_test(already_voted)]`. Without one, `happy_path` is used.
#[proc_macro_attribute]
pub fn session_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Reject invalid function signatures.
    let takes_fixture = match check_sig(&item_fn.sig) {
        Ok(takes_fixture) => takes_fixture,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let preset = parse_macro_input!(args as Option<Ident>)
        .unwrap_or_else(|| Ident::new("happy_path", proc_macro2::Span::call_site()));

    let call = if takes_fixture {
        quote! { #new_name(crate::testing::Fixture::#preset()) }
    } else {
        quote! { #new_name() }
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            log4rs_test_utils::test_logging::init_logging_once_for(
                ["ballot_session"],
                None,
                None,
            );

            /// The test itself.
            #item_fn

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .thread_name("session-test-worker")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(#call);
        }
    }
    .into()
}

/// Ensure the wrapped test is async and takes at most a single `Fixture`.
fn check_sig(sig: &Signature) -> Result<bool, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut takes_fixture = false;
    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                let is_fixture = type_path
                    .path
                    .segments
                    .last()
                    .map_or(false, |segment| segment.ident == "Fixture");
                if is_fixture && !takes_fixture {
                    takes_fixture = true;
                    continue;
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected a single `fixture_ident: Fixture` parameter",
        ));
    }

    Ok(takes_fixture)
}
