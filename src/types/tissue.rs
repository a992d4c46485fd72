/// Tissue properties of one spin population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tissue {
    /// Longitudinal relaxation. Unit: `s`
    pub t1: f64,
    /// Transverse relaxation. Unit: `s`
    pub t2: f64,
    /// Effective transverse relaxation including intra-voxel dephasing, only
    /// used if the simulation enables it. Unit: `s`
    pub t2_star: Option<f64>,
    /// Equilibrium magnetization, arbitrary units
    pub proton_density: f64,
    /// Unit: `Hz`
    pub chemical_shift: f64,
    /// Static field inhomogeneity. Unit: `Hz`
    pub delta_b0: f64,
}

impl Tissue {
    /// Tissue without off-resonance or T2* information.
    pub fn new(t1: f64, t2: f64, proton_density: f64) -> Self {
        Self {
            t1,
            t2,
            t2_star: None,
            proton_density,
            chemical_shift: 0.0,
            delta_b0: 0.0,
        }
    }

    pub fn with_t2_star(self, t2_star: f64) -> Self {
        Self {
            t2_star: Some(t2_star),
            ..self
        }
    }

    pub fn with_chemical_shift(self, chemical_shift: f64) -> Self {
        Self {
            chemical_shift,
            ..self
        }
    }

    pub fn with_delta_b0(self, delta_b0: f64) -> Self {
        Self { delta_b0, ..self }
    }

    /// Net off-resonance in the rotating frame. Unit: `Hz`
    pub fn off_resonance(&self) -> f64 {
        self.chemical_shift + self.delta_b0
    }
}

/// An independently simulated spin packet: where it sits and what it is made
/// of. The magnetization itself only exists inside the kernel while the
/// packet is being simulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Isochromat {
    /// Unit: `m`
    pub position: [f64; 3],
    pub tissue: Tissue,
}
