pub mod systemd_probe;
