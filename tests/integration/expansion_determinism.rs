// Determinism properties: identical inputs must produce byte-identical
// option lists and artifact names, and differing parameters must never
// collide to the same name.

use proptest::prelude::*;

use vacheck::engine::caps::Mode;
use vacheck::engine::options::{artifact_name, encoder_options};
use vacheck::engine::params::{CqpVariant, expand};

use crate::common::helpers::*;

fn cqp_variant(ipmode: u32, qp: u32, quality: u32, slices: u32) -> CqpVariant {
    CqpVariant {
        ipmode,
        qp,
        quality: Some(quality),
        slices: Some(slices),
        refmode: None,
        looplvl: None,
        loopshp: None,
        lowpower: false,
    }
}

proptest! {
    #[test]
    fn expansion_and_naming_are_idempotent(
        ipmode in 0u32..2,
        qp in 0u32..52,
        quality in 1u32..8,
        slices in 1u32..5,
        codec_idx in 0usize..3,
    ) {
        let codec = ["avc", "vp9", "mpeg2"][codec_idx];
        let spec = sample_spec();
        let variant = cqp_variant(ipmode, qp, quality, slices);

        let a = expand(&spec, codec, Mode::Hw, "main", vec![("city-352x288", variant)]).unwrap();
        let b = expand(&spec, codec, Mode::Hw, "main", vec![("city-352x288", variant)]).unwrap();
        prop_assert_eq!(&a, &b);

        prop_assert_eq!(artifact_name(&a[0]), artifact_name(&b[0]));
        prop_assert_eq!(
            encoder_options(&a[0]).unwrap(),
            encoder_options(&b[0]).unwrap()
        );
    }

    #[test]
    fn differing_qp_never_collides(
        qp_a in 0u32..52,
        qp_b in 0u32..52,
    ) {
        prop_assume!(qp_a != qp_b);
        let spec = sample_spec();
        let a = expand(
            &spec, "avc", Mode::Hw, "main",
            vec![("city-352x288", cqp_variant(1, qp_a, 4, 1))],
        ).unwrap();
        let b = expand(
            &spec, "avc", Mode::Hw, "main",
            vec![("city-352x288", cqp_variant(1, qp_b, 4, 1))],
        ).unwrap();
        prop_assert_ne!(artifact_name(&a[0]), artifact_name(&b[0]));
    }

    #[test]
    fn quantizer_naming_policy_holds_for_any_qp(qp in 0u32..52) {
        let spec = sample_spec();

        let vp9 = expand(
            &spec, "vp9", Mode::Hw, "profile0",
            vec![("city-352x288", cqp_variant(1, qp, 4, 1))],
        ).unwrap();
        let keys: Vec<String> = encoder_options(&vp9[0]).unwrap()
            .into_iter().map(|(k, _)| k).collect();
        prop_assert!(keys.contains(&"yac-qi".to_string()));
        prop_assert!(!keys.contains(&"init-qp".to_string()));

        let mpeg2 = expand(
            &spec, "mpeg2", Mode::Hw, "main",
            vec![("city-352x288", cqp_variant(1, qp, 4, 1))],
        ).unwrap();
        let opts = encoder_options(&mpeg2[0]).unwrap();
        let quantizer = opts.iter().find(|(k, _)| k == "quantizer");
        prop_assert!(quantizer.is_some());
        // bound to the mapped field, not the raw qp
        prop_assert_eq!(
            quantizer.unwrap().1.clone(),
            mpeg2[0].mqp.unwrap().to_string()
        );
    }
}
