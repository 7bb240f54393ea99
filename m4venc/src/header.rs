use crate::bitwriter::BitWriter;
use crate::vop::VopType;

const VO_START_CODE: u32 = 0x8;
const VOL_START_CODE: u32 = 0x12;
const VOP_START_CODE: u32 = 0x1B6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderParams {
    pub width: u32,
    pub height: u32,
    pub vop_type: VopType,
    pub rounding: u8,
    pub quant: u8,
    pub fcode: u8,
}

fn marker(bw: &mut BitWriter) {
    bw.put_bit(true);
}

/// Writes the fixed video object and video object layer headers followed by
/// the VOP header. Everything except the fields in `params` is constant.
pub fn write_fixed_header(bw: &mut BitWriter, params: &HeaderParams) {
    debug_assert!(
        params.vop_type == VopType::Intra || (1..=4).contains(&params.fcode),
        "fcode {} out of range for a predicted VOP",
        params.fcode
    );

    bw.put_bits(VO_START_CODE, 27);
    bw.put_bits(0, 5);

    bw.put_bits(VOL_START_CODE, 28);
    bw.put_bits(0, 4);
    bw.put_bit(false); // random_accessible_vol
    bw.put_bits(0, 8); // video_object_type_indication
    bw.put_bit(false); // is_object_layer_identifier
    bw.put_bits(0, 4); // aspect_ratio_info
    bw.put_bit(false); // vol_control_parameters
    bw.put_bits(0, 2); // rectangular shape
    marker(bw);
    bw.put_bits(1, 16); // vop_time_increment_resolution
    marker(bw);
    bw.put_bit(false); // fixed_vop_rate
    marker(bw);
    bw.put_bits(params.width, 13);
    marker(bw);
    bw.put_bits(params.height, 13);
    marker(bw);
    bw.put_bit(false); // interlaced
    bw.put_bit(false); // obmc_disable
    bw.put_bit(false); // sprite_enable
    bw.put_bit(false); // not_8_bit
    bw.put_bit(false); // quant_type
    bw.put_bit(true); // complexity_estimation_disable
    bw.put_bit(false); // resync_marker_disable
    bw.put_bit(false); // data_partitioned
    bw.put_bit(false); // scalability

    bw.pad_to_byte();
    write_vop_header(bw, params);
}

fn write_vop_header(bw: &mut BitWriter, params: &HeaderParams) {
    bw.put_bits(VOP_START_CODE, 32);
    bw.put_bits(params.vop_type.coding_type(), 2);
    bw.put_bit(false); // modulo_time_base
    marker(bw);
    bw.put_bits(0, 1); // vop_time_increment
    marker(bw);
    bw.put_bit(true); // vop_coded
    if params.vop_type == VopType::Predicted {
        bw.put_bits(params.rounding as u32, 1);
    }
    bw.put_bits(0, 3); // intra_dc_vlc_thr
    bw.put_bits(params.quant as u32, 5);
    if params.vop_type == VopType::Predicted {
        bw.put_bits(params.fcode as u32, 3);
    }
}
