// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{Gadget, UriBuilder};

/// Generates a clonable, thread-safe wrapper around a user-provided closure.
///
/// ```rust,ignore
/// define_hook!(IsExcluded(Fn(gadget: &Gadget) -> bool));
/// ```
///
/// The generated type exposes `new`, `call`, `Clone` and `Debug`.
macro_rules! define_hook {
    ($name:ident(Fn($($param_name:ident: $param_ty:ty),*) -> $return_ty:ty)) => {
        pub(crate) struct $name(std::sync::Arc<dyn Fn($($param_ty),*) -> $return_ty + Send + Sync>);

        impl $name {
            pub(crate) fn new<F>(hook: F) -> Self
            where
                F: Fn($($param_ty),*) -> $return_ty + Send + Sync + 'static,
            {
                Self(std::sync::Arc::new(hook))
            }

            pub(crate) fn call(&self, $($param_name: $param_ty),*) -> $return_ty {
                (self.0)($($param_name),*)
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                Self(std::sync::Arc::clone(&self.0))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name)).finish()
            }
        }
    };

    ($name:ident(Fn($($param_name:ident: $param_ty:ty),*))) => {
        define_hook!($name(Fn($($param_name: $param_ty),*) -> ()));
    };
}

define_hook!(LockedDomainExclusion(Fn(gadget: &Gadget) -> bool));
define_hook!(SchemeSelection(Fn(gadget: &Gadget, container: &str) -> Option<String>));
define_hook!(TokenForRendering(Fn(gadget: &Gadget) -> bool));
define_hook!(ExtraParameters(Fn(gadget: &Gadget, builder: &mut UriBuilder)));

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{GadgetContext, GadgetSpec, Uri};

    static_assertions::assert_impl_all!(LockedDomainExclusion: Send, Sync, Clone, std::fmt::Debug);

    fn gadget() -> Gadget {
        let url = Uri::parse("http://g.com/g.xml").unwrap();
        Gadget::new(GadgetContext::new("default", url.clone()), GadgetSpec::new(url))
    }

    #[test]
    fn clones_share_the_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let hook = TokenForRendering::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
            true
        });

        assert!(hook.call(&gadget()));
        assert!(hook.clone().call(&gadget()));
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn unit_hook_mutates_builder() {
        let hook = ExtraParameters::new(|_, builder| {
            builder.add_query_parameter("extra", "1");
        });
        let mut builder = UriBuilder::new();

        hook.call(&gadget(), &mut builder);

        assert_eq!(builder.query_parameter("extra").as_deref(), Some("1"));
        assert_eq!(format!("{hook:?}"), "ExtraParameters");
    }

    #[test]
    fn scheme_hook_sees_container() {
        let hook = SchemeSelection::new(|_, container| (container == "secure").then(|| "https".to_owned()));

        assert_eq!(hook.call(&gadget(), "secure").as_deref(), Some("https"));
        assert_eq!(hook.call(&gadget(), "default"), None);
    }
}
