/*!
# Writers module
Contains the logic for writing the annotated CNV outputs.
*/
/// Generates the annotated CNV table and its JSON counterpart; each row corresponds to a CNV
pub mod cnv_summary;
