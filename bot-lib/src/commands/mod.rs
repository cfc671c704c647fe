pub mod vc_rename;
