// Simulates a 2D gradient echo of a small disc phantom and prints the
// reconstructed module image as ASCII art.

use magsim::{
    reconstruct, Apodization, Error, Kernel, ObjectModel, ReconConfig, Sequence, Shape, SimConfig,
    Tissue, TimelineBuilder,
};

/// Cartesian gradient echo, one k-space line per excitation.
struct Gre {
    shape: Shape,
    fov: [f64; 3],
    flip_angle: f64,
    dwell: f64,
    tr: f64,
}

impl Sequence for Gre {
    fn kspace_shape(&self) -> Shape {
        self.shape
    }

    fn emit(&self, timeline: &mut TimelineBuilder) -> Result<(), Error> {
        let [nx, ny, nz] = self.shape.dims();
        let prephase = 1e-3;
        // One k-space step per `dwell`
        let readout = 1.0 / (self.fov[0] * self.dwell);

        for z in 0..nz {
            for y in 0..ny {
                let line_start = timeline.cursor();
                let k = [
                    -((nx / 2) as f64) / self.fov[0],
                    (y as f64 - (ny / 2) as f64) / self.fov[1],
                    (z as f64 - (nz / 2) as f64) / self.fov[2],
                ];

                timeline
                    .rf(self.flip_angle, 0.0, 1e-4)
                    .encode(k.map(|k| k / prephase), prephase);
                for x in 0..nx {
                    timeline
                        .acquire([x, y, z])
                        .encode([readout, 0.0, 0.0], self.dwell);
                }

                let rest = self.tr - (timeline.cursor() - line_start);
                if rest < 0.0 {
                    return Err(Error::Config(format!("TR of {} s is too short", self.tr)));
                }
                timeline.precess(rest);
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), Error> {
    let shape = Shape::new([32, 32, 1])?;
    let voxel_size = [2e-3, 2e-3, 5e-3];
    let mut object = ObjectModel::new(shape, voxel_size)?;

    let white_matter = Tissue::new(0.8, 0.07, 0.7);
    let csf = Tissue::new(4.0, 2.0, 1.0);
    let fat = Tissue::new(0.3, 0.08, 0.9).with_chemical_shift(-440.0);

    for y in 0..32 {
        for x in 0..32 {
            let r = ((x as f64 - 16.0).powi(2) + (y as f64 - 16.0).powi(2)).sqrt();
            if r < 6.0 {
                object.set([x, y, 0], csf)?;
            } else if r < 12.0 {
                object.set([x, y, 0], white_matter)?;
            } else if r < 14.0 {
                object.set([x, y, 0], fat)?;
            }
        }
    }

    let sequence = Gre {
        shape,
        fov: object.fov(),
        flip_angle: 30f64.to_radians(),
        dwell: 20e-6,
        tr: 10e-3,
    };

    let kernel = Kernel::new(SimConfig::default());
    let kspace = kernel.simulate_sequence(&object, &sequence)?;
    let image = reconstruct(&kspace, ReconConfig::default().apodization(Apodization::Hamming))?;

    let module = image.module();
    let max = module.data().iter().cloned().fold(0.0, f64::max);
    println!("Peak module: {max:.4}");

    let ramp = [' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];
    for y in 0..32 {
        let row: String = (0..32)
            .map(|x| {
                let value = module.get([x, y, 0]).copied().unwrap_or_default() / max;
                ramp[((value * 9.0).round() as usize).min(9)]
            })
            .collect();
        println!("{row}");
    }

    Ok(())
}
