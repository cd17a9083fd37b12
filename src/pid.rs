// PIPEGOV PID CONTROLLER
// DISCRETE-TIME PID WITH INTEGRAL ANTI-WINDUP.
//
// INTEGRAL IS CLAMPED TO +/- HALF THE OUTPUT SPAN, SO A LONG VIOLATION
// EPISODE CANNOT BANK MORE CORRECTION THAN THE OUTPUT CAN EVER EXPRESS.
// OUTPUT UNITS ARE WHATEVER THE CALLER ROUNDS IT INTO (HERE: TABLE STEPS).

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PidTerms {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub output: f64,
}

#[derive(Clone, Debug)]
pub struct Pid {
    kp: f64,
    ki: f64,
    kd: f64,
    output_min: f64,
    output_max: f64,
    integral_limit: f64,
    integral: f64,
    prev_error: f64,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64, output_min: f64, output_max: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            output_min,
            output_max,
            integral_limit: (output_max - output_min) * 0.5,
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    pub fn with_gains(gains: (f64, f64, f64), output_min: f64, output_max: f64) -> Self {
        Self::new(gains.0, gains.1, gains.2, output_min, output_max)
    }

    pub fn update(&mut self, error: f64, dt: f64) -> PidTerms {
        self.integral = (self.integral + error * dt)
            .clamp(-self.integral_limit, self.integral_limit);
        let derivative = if dt > 0.0 { (error - self.prev_error) / dt } else { 0.0 };
        self.prev_error = error;

        let p = self.kp * error;
        let i = self.ki * self.integral;
        let d = self.kd * derivative;
        let output = (p + i + d).clamp(self.output_min, self.output_max);
        PidTerms { p, i, d, output }
    }

    // CALLED WHILE THE OBJECTIVE IS SATISFIED: NEXT EPISODE STARTS CLEAN
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }
}
