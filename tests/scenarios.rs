use std::f64::consts::{FRAC_PI_2, PI};

use assert2::{check, let_assert};
use magsim::recon::Fft3d;
use magsim::{
    reconstruct, Apodization, Error, Isochromat, KSpace, Kernel, ObjectModel, ReconConfig, Shape,
    SimConfig, Timeline, TimelineBuilder, Tissue, Volume,
};
use num_complex::Complex64;

fn kernel(workers: usize) -> Kernel {
    Kernel::new(SimConfig::default().workers(workers))
}

/// Excite once and visit all four k-space points of a 2x2 grid.
fn two_by_two(fov: f64) -> Timeline {
    let tau = 1e-3;
    let step = 1.0 / (fov * tau);
    let mut timeline = TimelineBuilder::new();
    timeline
        .rf(FRAC_PI_2, 0.0, 1e-4)
        .encode([-step, -step, 0.0], tau)
        .acquire([0, 0, 0])
        .encode([step, 0.0, 0.0], tau)
        .acquire([1, 0, 0])
        .encode([-step, step, 0.0], tau)
        .acquire([0, 1, 0])
        .encode([step, 0.0, 0.0], tau)
        .acquire([1, 1, 0]);
    timeline.build()
}

#[test]
fn uniform_object_reconstructs_flat() {
    let shape = Shape::new([2, 2, 1]).unwrap();
    let voxel = 5e-3;
    let pd = 0.8;
    // Relaxation is negligible over the few milliseconds of the timeline
    let tissue = Tissue::new(1e6, 1e6, pd);
    let object = ObjectModel::uniform(shape, [voxel, voxel, voxel], tissue).unwrap();

    let kspace = kernel(2)
        .simulate(&object, &two_by_two(2.0 * voxel), shape)
        .unwrap();
    let image = reconstruct(&kspace, ReconConfig::default()).unwrap();

    for value in image.module().data() {
        check!((value - pd).abs() < 1e-6);
    }
    // Excitation about x leaves the magnetization along -y
    for value in image.phase().data() {
        check!((value + FRAC_PI_2).abs() < 1e-6);
    }
}

#[test]
fn single_voxel_is_localized() {
    let shape = Shape::new([2, 2, 1]).unwrap();
    let voxel = 5e-3;
    let mut object = ObjectModel::new(shape, [voxel, voxel, voxel]).unwrap();
    object.set([1, 0, 0], Tissue::new(1e6, 1e6, 1.0)).unwrap();

    let kspace = kernel(1)
        .simulate(&object, &two_by_two(2.0 * voxel), shape)
        .unwrap();
    let module = reconstruct(&kspace, ReconConfig::default())
        .unwrap()
        .module();

    check!((module.get([1, 0, 0]).unwrap() - 1.0).abs() < 1e-6);
    for coord in [[0, 0, 0], [0, 1, 0], [1, 1, 0]] {
        check!(*module.get(coord).unwrap() < 1e-6);
    }
}

#[test]
fn excitation_then_free_decay() {
    let shape = Shape::new([1, 1, 1]).unwrap();
    let object = ObjectModel::uniform(shape, [1e-3; 3], Tissue::new(1.0, 0.1, 1.0)).unwrap();

    let mut timeline = TimelineBuilder::new();
    timeline.rf(FRAC_PI_2, 0.0, 0.0).precess(10e-3).acquire([0, 0, 0]);

    let kspace = kernel(1).simulate(&object, &timeline.build(), shape).unwrap();
    let signal = kspace.get([0, 0, 0]).unwrap();
    check!((signal.norm() - (-0.1f64).exp()).abs() < 1e-12);
    check!((signal.norm() - 0.9048).abs() < 1e-4);
}

#[test]
fn zero_t2_gives_zero_signal() {
    let shape = Shape::new([1, 1, 1]).unwrap();
    let object = ObjectModel::uniform(shape, [1e-3; 3], Tissue::new(1.0, 0.0, 1.0)).unwrap();

    let mut timeline = TimelineBuilder::new();
    timeline.rf(FRAC_PI_2, 0.0, 0.0).precess(1e-3).acquire([0, 0, 0]);

    let kspace = kernel(1).simulate(&object, &timeline.build(), shape).unwrap();
    check!(kspace.get([0, 0, 0]) == Some(Complex64::new(0.0, 0.0)));
}

#[test]
fn worker_count_is_invisible() {
    let shape = Shape::new([4, 4, 1]).unwrap();
    let isochromats: Vec<Isochromat> = (0..500)
        .map(|_| Isochromat {
            position: [
                (rand::random::<f64>() - 0.5) * 0.02,
                (rand::random::<f64>() - 0.5) * 0.02,
                0.0,
            ],
            tissue: Tissue::new(
                rand::random::<f64>() + 0.1,
                rand::random::<f64>() * 0.1 + 0.01,
                rand::random::<f64>(),
            )
            .with_delta_b0((rand::random::<f64>() - 0.5) * 50.0),
        })
        .collect();

    let mut timeline = TimelineBuilder::new();
    for y in 0..4 {
        timeline.rf(0.3, 0.0, 1e-4).encode([-100.0, (y as f64 - 2.0) * 50.0, 0.0], 2e-3);
        for x in 0..4 {
            timeline.acquire([x, y, 0]).encode([50.0, 0.0, 0.0], 1e-3);
        }
        timeline.precess(5e-3);
    }
    let timeline = timeline.build();

    let run = |workers| {
        Kernel::new(SimConfig::default().workers(workers).partition_len(37))
            .simulate_isochromats(&isochromats, &timeline, shape)
            .unwrap()
    };
    let reference = run(1);
    for workers in [2, 3, 8] {
        check!(run(workers) == reference);
    }
}

#[test]
fn invalid_timeline_is_rejected_before_simulation() {
    let shape = Shape::new([2, 1, 1]).unwrap();
    let object = ObjectModel::uniform(shape, [1e-3; 3], Tissue::new(1.0, 0.1, 1.0)).unwrap();

    let mut timeline = TimelineBuilder::new();
    timeline.rf(FRAC_PI_2, 0.0, 1e-3).acquire([2, 0, 0]);

    let_assert!(
        Err(Error::CoordOutOfRange { coord, .. }) =
            kernel(1).simulate(&object, &timeline.build(), shape)
    );
    check!(coord == [2, 0, 0]);
}

#[test]
fn fourier_roundtrip_through_reconstruction() {
    let shape = Shape::new([6, 5, 2]).unwrap();
    let data: Vec<Complex64> = (0..shape.len())
        .map(|_| Complex64::from_polar(0.5 + rand::random::<f64>(), (rand::random::<f64>() - 0.5) * PI))
        .collect();
    let image = Volume::from_vec(shape, data).unwrap();

    let kspace = KSpace::from_volume(Fft3d::new(shape).forward_centred(&image).unwrap());
    let recon = reconstruct(&kspace, ReconConfig::default()).unwrap();

    for (a, b) in recon.complex().data().iter().zip(image.data()) {
        check!((a - b).norm() < 1e-12);
    }
    for (phase, b) in recon.phase().data().iter().zip(image.data()) {
        check!((phase - b.arg()).abs() < 1e-9);
    }
}

#[test]
fn apodization_suppresses_the_border() {
    let shape = Shape::new([8, 1, 1]).unwrap();
    let kspace = KSpace::from_volume(
        Volume::from_vec(shape, vec![Complex64::new(1.0, 0.0); 8]).unwrap(),
    );

    let plain = reconstruct(&kspace, ReconConfig::default()).unwrap();
    let windowed =
        reconstruct(&kspace, ReconConfig::default().apodization(Apodization::Hanning)).unwrap();

    // A flat k-space is a point at the image centre, windowing spreads it
    let centre = [4, 0, 0];
    check!((plain.module().get(centre).unwrap() - 1.0).abs() < 1e-12);
    check!(*windowed.module().get(centre).unwrap() < 1.0);
    check!(*windowed.module().get([3, 0, 0]).unwrap() > 1e-3);
}
