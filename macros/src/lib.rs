use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Expr, Fields, Lit, Meta, parse_macro_input, punctuated::Punctuated, Token};

/// Derives the `ArchConfig` trait for a unit struct.
///
/// Every constant defaults to `DefaultConfig`'s value; override individual
/// constants with `#[arch_config(...)]`.
///
/// # Example
///
/// ```ignore
/// use tusb_arch::ArchConfig;
///
/// #[derive(ArchConfig)]
/// #[arch_config(sleep_check_ms = 20, use_stats = true, host_name = "bench-rig")]
/// pub struct BenchConfig;
/// ```
///
/// This generates:
///
/// ```ignore
/// impl ::tusb_arch::config::ArchConfig for BenchConfig {
///     const SLEEP_CHECK_MS: u32 = 20;
///     const POLL_SLEEP_TICK_US: u64 = <DefaultConfig as ArchConfig>::POLL_SLEEP_TICK_US;
///     const STATS_DUMP_INTERVAL_MS: u32 = <DefaultConfig as ArchConfig>::STATS_DUMP_INTERVAL_MS;
///     const USE_STATS: bool = true;
///     const USE_OTP_MAC: bool = <DefaultConfig as ArchConfig>::USE_OTP_MAC;
///     const HOST_NAME: &'static str = "bench-rig";
/// }
/// ```
///
/// # Requirements
///
/// - The type must be a unit struct
/// - Keys: `sleep_check_ms`, `poll_sleep_tick_us`, `stats_dump_interval_ms`
///   (integers), `use_stats`, `use_otp_mac` (bools), `host_name` (string)
/// - `sleep_check_ms` must be non-zero
#[proc_macro_derive(ArchConfig, attributes(arch_config))]
pub fn derive_arch_config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Values collected from `#[arch_config(...)]`.
#[derive(Default)]
struct Overrides {
    sleep_check_ms: Option<proc_macro2::TokenStream>,
    poll_sleep_tick_us: Option<proc_macro2::TokenStream>,
    stats_dump_interval_ms: Option<proc_macro2::TokenStream>,
    use_stats: Option<proc_macro2::TokenStream>,
    use_otp_mac: Option<proc_macro2::TokenStream>,
    host_name: Option<proc_macro2::TokenStream>,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    // Only unit structs make sense as zero-sized config markers
    match &input.data {
        Data::Struct(data) if matches!(data.fields, Fields::Unit) => {}
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "ArchConfig can only be derived for unit structs",
            ));
        }
    }

    let overrides = parse_overrides(input)?;

    let default = quote! { <::tusb_arch::config::DefaultConfig as ::tusb_arch::config::ArchConfig> };
    let pick = |value: Option<proc_macro2::TokenStream>, konst: proc_macro2::TokenStream| {
        value.unwrap_or_else(|| quote! { #default::#konst })
    };

    let sleep_check_ms = pick(overrides.sleep_check_ms, quote! { SLEEP_CHECK_MS });
    let poll_sleep_tick_us = pick(overrides.poll_sleep_tick_us, quote! { POLL_SLEEP_TICK_US });
    let stats_dump_interval_ms =
        pick(overrides.stats_dump_interval_ms, quote! { STATS_DUMP_INTERVAL_MS });
    let use_stats = pick(overrides.use_stats, quote! { USE_STATS });
    let use_otp_mac = pick(overrides.use_otp_mac, quote! { USE_OTP_MAC });
    let host_name = pick(overrides.host_name, quote! { HOST_NAME });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::tusb_arch::config::ArchConfig for #name #ty_generics #where_clause {
            const SLEEP_CHECK_MS: u32 = #sleep_check_ms;
            const POLL_SLEEP_TICK_US: u64 = #poll_sleep_tick_us;
            const STATS_DUMP_INTERVAL_MS: u32 = #stats_dump_interval_ms;
            const USE_STATS: bool = #use_stats;
            const USE_OTP_MAC: bool = #use_otp_mac;
            const HOST_NAME: &'static str = #host_name;
        }
    })
}

fn parse_overrides(input: &DeriveInput) -> syn::Result<Overrides> {
    let mut overrides = Overrides::default();

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("arch_config")) {
        let items = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for item in items {
            let Meta::NameValue(nv) = &item else {
                return Err(syn::Error::new_spanned(item, "expected `key = value`"));
            };
            let key = nv
                .path
                .get_ident()
                .map(|i| i.to_string())
                .unwrap_or_default();
            let lit = match &nv.value {
                Expr::Lit(expr) => &expr.lit,
                other => return Err(syn::Error::new_spanned(other, "expected a literal")),
            };

            match (key.as_str(), lit) {
                ("sleep_check_ms", Lit::Int(i)) => {
                    if i.base10_parse::<u32>()? == 0 {
                        return Err(syn::Error::new_spanned(i, "sleep_check_ms must be non-zero"));
                    }
                    overrides.sleep_check_ms = Some(quote! { #i });
                }
                ("poll_sleep_tick_us", Lit::Int(i)) => {
                    i.base10_parse::<u64>()?;
                    overrides.poll_sleep_tick_us = Some(quote! { #i });
                }
                ("stats_dump_interval_ms", Lit::Int(i)) => {
                    i.base10_parse::<u32>()?;
                    overrides.stats_dump_interval_ms = Some(quote! { #i });
                }
                ("use_stats", Lit::Bool(b)) => overrides.use_stats = Some(quote! { #b }),
                ("use_otp_mac", Lit::Bool(b)) => overrides.use_otp_mac = Some(quote! { #b }),
                ("host_name", Lit::Str(s)) => overrides.host_name = Some(quote! { #s }),
                (
                    "sleep_check_ms" | "poll_sleep_tick_us" | "stats_dump_interval_ms"
                    | "use_stats" | "use_otp_mac" | "host_name",
                    _,
                ) => {
                    return Err(syn::Error::new_spanned(lit, "wrong literal type for this key"));
                }
                _ => {
                    return Err(syn::Error::new_spanned(&nv.path, "unknown arch_config key"));
                }
            }
        }
    }

    Ok(overrides)
}
