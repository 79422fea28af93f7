use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use std::sync::Arc;
use toy_rss_fixed::{
    FieldConfig, LocalRepository, MpcError, SharedFixedPoint, decode, encode,
};

type Shared = SharedFixedPoint<LocalRepository>;

fn binary_setup() -> (Arc<LocalRepository>, Arc<FieldConfig>) {
    let config = FieldConfig::builder()
        .base(2)
        .precision(32)
        .precision_fractional(16)
        .kappa(40)
        .build()
        .unwrap();
    let repo = LocalRepository::with_seed(config.field(), 3, 31).unwrap();
    (Arc::new(repo), Arc::new(config))
}

fn decimal_setup(seed: u64) -> (Arc<LocalRepository>, Arc<FieldConfig>) {
    let config = FieldConfig::default();
    let repo = LocalRepository::with_seed(config.field(), 3, seed).unwrap();
    (Arc::new(repo), Arc::new(config))
}

fn shared(value: f64, repo: &Arc<LocalRepository>, config: &Arc<FieldConfig>) -> Shared {
    SharedFixedPoint::new(value, Arc::clone(repo), Arc::clone(config)).unwrap()
}

fn quantized(value: f64, config: &FieldConfig) -> f64 {
    decode(&encode(value, config).unwrap(), config)
}

#[test]
fn end_to_end_product_in_binary_base() {
    let (repo, config) = binary_setup();
    let a = shared(2.5, &repo, &config);
    let b = shared(4.0, &repo, &config);

    let product = a.mul(&b).unwrap().reveal().unwrap();
    assert_abs_diff_eq!(product, 10.0, epsilon = 1.0 / config.scale() as f64);
}

#[test]
fn small_values_keep_their_sign_through_multiplication() {
    let (repo, config) = decimal_setup(5);
    let step = 1.0 / config.scale() as f64;
    let one = shared(1.0, &repo, &config);

    for value in [0.001, -0.001] {
        let x = shared(value, &repo, &config);
        let product = x.mul(&one).unwrap().reveal().unwrap();
        assert_eq!(product.signum(), value.signum(), "{value} became {product}");
        assert_abs_diff_eq!(product, value, epsilon = 1.5 * step);

        let squared = x.mul(&x).unwrap().reveal().unwrap();
        assert!(squared > 0.0, "square of {value} is {squared}");
        assert_abs_diff_eq!(squared, 1e-6, epsilon = 1.5 * step);
    }
}

#[test]
fn truncating_a_value_already_at_target_scale_only_shrinks_it() {
    // A single-scale value is read as if it were double scale: truncation then
    // divides it by the scale, and must not wrap around or flip its sign.
    let (repo, config) = decimal_setup(8);
    let step = 1.0 / config.scale() as f64;
    for value in [3.5, -3.5] {
        let truncated = shared(value, &repo, &config).truncate().unwrap();
        let revealed = truncated.reveal().unwrap();
        let expected = value / config.scale() as f64;
        assert!((revealed - expected).abs() <= step, "{value} gave {revealed}");
    }
}

#[test]
fn composed_expression_matches_plain_arithmetic() {
    let (repo, config) = decimal_setup(13);
    let x = shared(3.0, &repo, &config);
    let y = shared(-1.5, &repo, &config);
    let z = shared(0.25, &repo, &config);

    // (x + y) * z - 2 * x + 1
    let result = x
        .add(&y)
        .and_then(|sum| sum.mul(&z))
        .and_then(|scaled| scaled.sub(&x.mul(2.0)?))
        .and_then(|diff| diff.add(1.0))
        .unwrap()
        .reveal()
        .unwrap();
    assert_abs_diff_eq!(result, -4.625, epsilon = 4.0 / config.scale() as f64);
}

#[test]
fn division_is_only_defined_for_plain_divisors() {
    let (repo, config) = decimal_setup(21);
    let x = shared(9.0, &repo, &config);
    let y = shared(3.0, &repo, &config);

    let step = 1.0 / config.scale() as f64;
    let third = x.div(3.0).unwrap().reveal().unwrap();
    assert_abs_diff_eq!(third, 3.0, epsilon = 3.0 * step);
    assert!(matches!(x.div(&y), Err(MpcError::Unsupported { .. })));

    let large = shared(50_000.0, &repo, &config);
    let quotient = large.div(3.0).unwrap().reveal().unwrap();
    assert_abs_diff_eq!(quotient, 50_000.0 / 3.0, epsilon = 3.0 * step);
}

#[test]
fn repositories_with_more_parties_agree() {
    let config = Arc::new(FieldConfig::default());
    for parties in [2, 5] {
        let repo = Arc::new(LocalRepository::with_seed(config.field(), parties, 3).unwrap());
        let x = shared(-7.25, &repo, &config);
        let y = shared(2.0, &repo, &config);
        assert_eq!(x.raw().shares().unwrap().len(), parties);
        assert_abs_diff_eq!(
            x.mul(&y).unwrap().reveal().unwrap(),
            -14.5,
            epsilon = 1.5 / config.scale() as f64
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn encoding_round_trips_within_one_step(
        value in prop_oneof![-1.0e6f64..1.0e6, -1.0e-3f64..1.0e-3],
    ) {
        // A power-of-two scale keeps the float arithmetic exact, so only
        // the truncation itself contributes error.
        let (_, config) = binary_setup();
        let step = 1.0 / config.scale() as f64;
        let decoded = decode(&encode(value, &config).unwrap(), &config);
        prop_assert!((decoded - value).abs() < step, "{} decoded to {}", value, decoded);
        if value < 0.0 {
            prop_assert!(decoded <= 0.0);
        }
    }

    #[test]
    fn division_stays_within_a_few_steps(
        dividend in -1.0e4f64..1.0e4,
        divisor in prop_oneof![1.0e-3f64..1.0e3, -1.0e3f64..-1.0e-3],
    ) {
        let (repo, config) = decimal_setup(6);
        let step = 1.0 / config.scale() as f64;
        let expected = quantized(dividend, &config) / divisor;
        prop_assume!(expected.abs() < 1.0e7);
        let x = shared(dividend, &repo, &config);
        let got = x.div(divisor).unwrap().reveal().unwrap();
        prop_assert!(
            (got - expected).abs() <= 3.0 * step,
            "{} / {} gave {}, expected {}", dividend, divisor, got, expected
        );
    }

    #[test]
    fn addition_is_homomorphic(a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6) {
        let (repo, config) = decimal_setup(1);
        let x = shared(a, &repo, &config);
        let y = shared(b, &repo, &config);

        let field = config.field();
        let expected = field.add(&encode(a, &config).unwrap(), &encode(b, &config).unwrap());
        prop_assert_eq!(x.add(&y).unwrap().raw().reveal().unwrap(), expected);
    }

    #[test]
    fn multiplication_is_within_one_quantization_step(
        a in -1000.0f64..1000.0,
        b in -1000.0f64..1000.0,
    ) {
        let (repo, config) = decimal_setup(2);
        let step = 1.0 / config.scale() as f64;
        let x = shared(a, &repo, &config);
        let y = shared(b, &repo, &config);

        let expected = quantized(a, &config) * quantized(b, &config);
        let got = x.mul(&y).unwrap().reveal().unwrap();
        prop_assert!((got - expected).abs() <= 1.5 * step, "{} * {} gave {}", a, b, got);
    }

    #[test]
    fn plain_and_shared_factors_agree(a in -100.0f64..100.0, b in -100.0f64..100.0) {
        let (repo, config) = decimal_setup(4);
        let step = 1.0 / config.scale() as f64;
        let x = shared(a, &repo, &config);
        let y = shared(b, &repo, &config);

        let with_shared = x.mul(&y).unwrap().reveal().unwrap();
        let with_plain = x.mul(b).unwrap().reveal().unwrap();
        prop_assert!((with_shared - with_plain).abs() <= 2.0 * step);
    }
}
