use ml::{clip_grad_norm, Adam, AdamState, PolicyParameters};

/// Scalar loss used for gradient checks: a fixed linear read-out of the
/// action mean and the value.
fn loss(params: &PolicyParameters, obs: &[f32], weights: &[f32], value_weight: f32) -> f32 {
    let fwd = params.forward(obs);
    fwd.mean.iter().zip(weights).map(|(m, w)| m * w).sum::<f32>() + value_weight * fwd.value
}

#[test]
fn backward_matches_finite_differences() {
    let params = PolicyParameters::new(4, &[5, 3], 2, -0.5, 11);
    // larger actor weights so the mean path carries a visible gradient
    let mut params = params;
    for w in &mut params.actor.w {
        *w *= 50.0;
    }
    let obs = [0.3, -0.7, 0.9, 0.1];
    let weights = [0.8, -1.2];
    let value_weight = 0.6;

    let fwd = params.forward(&obs);
    let mut grads = params.zeros_like();
    params.backward(&fwd, &weights, value_weight, &mut grads);
    let analytic = grads.flatten();

    let eps = 1e-2;
    let base = params.flatten();
    let mut probe = params.clone();
    for (k, &g) in analytic.iter().enumerate() {
        let bump = |p: &mut PolicyParameters, delta: f32| {
            let mut idx = k;
            for s in p.slices_mut() {
                if idx < s.len() {
                    s[idx] = base[k] + delta;
                    return;
                }
                idx -= s.len();
            }
        };
        bump(&mut probe, eps);
        let plus = loss(&probe, &obs, &weights, value_weight);
        bump(&mut probe, -eps);
        let minus = loss(&probe, &obs, &weights, value_weight);
        bump(&mut probe, 0.0);

        let numeric = (plus - minus) / (2.0 * eps);
        let tolerance = 2e-2 * g.abs().max(1.0);
        assert!((numeric - g).abs() < tolerance, "param {k}: numeric {numeric}, analytic {g}");
    }
}

#[test]
fn forward_shapes_and_ranges() {
    let params = PolicyParameters::new(12, &[64, 64], 3, -0.5, 1);
    assert_eq!(params.obs_dim(), 12);
    assert_eq!(params.act_dim(), 3);
    let fwd = params.forward(&[1.0; 12]);
    assert_eq!(fwd.mean.len(), 3);
    assert!(fwd.mean.iter().all(|m| (-1.0..=1.0).contains(m)));
    assert_eq!(fwd.activations.len(), 3);
    assert_eq!(params.to_bytes().len(), 4 * params.param_count());
}

#[test]
fn same_seed_same_parameters() {
    let a = PolicyParameters::new(12, &[16], 3, -0.5, 42);
    let b = PolicyParameters::new(12, &[16], 3, -0.5, 42);
    let c = PolicyParameters::new(12, &[16], 3, -0.5, 43);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn adam_minimises_a_quadratic() {
    let mut params = PolicyParameters::new(3, &[4], 2, 0.0, 5);
    let adam = Adam::with_lr(0.05);
    let mut state = AdamState::new(&params);
    for _ in 0..2_000 {
        let mut grads = params.zeros_like();
        for (g, p) in grads.slices_mut().into_iter().zip(params.slices()) {
            for (gv, pv) in g.iter_mut().zip(p) {
                *gv = 2.0 * (pv - 1.0);
            }
        }
        adam.step(&mut state, &mut params, &grads);
    }
    assert_eq!(params.version, 2_000);
    assert!(params.flatten().iter().all(|v| (v - 1.0).abs() < 1e-2));
}

#[test]
fn gradient_norm_is_clipped() {
    let params = PolicyParameters::new(3, &[4], 2, 0.0, 5);
    let mut grads = params.zeros_like();
    for s in grads.slices_mut() {
        s.fill(3.0);
    }
    let before = clip_grad_norm(&mut grads, 0.5);
    assert!((before - 3.0 * (params.param_count() as f32).sqrt()).abs() < 1e-3);
    assert!((grads.global_norm() - 0.5).abs() < 1e-4);

    let mut small = params.zeros_like();
    small.log_std[0] = 0.1;
    clip_grad_norm(&mut small, 0.5);
    assert_eq!(small.log_std[0], 0.1);
}
